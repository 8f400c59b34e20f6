use approx::assert_abs_diff_eq;
use gerber_laser::geometry::clearance::{compute_clearance, ClearanceRequest, PlateRegion};
use gerber_laser::geometry::mirror::mirror_path;
use gerber_laser::geometry::shapes::shapes_area;
use gerber_laser::gerber::parse_layer;
use gerber_laser::types::BBox;
use gerber_laser::{convert, ConvertOptions};

fn assert_bbox(bbox: &BBox, x: f64, y: f64, width: f64, height: f64) {
    assert_abs_diff_eq!(bbox.x(), x, epsilon = 1e-9);
    assert_abs_diff_eq!(bbox.y(), y, epsilon = 1e-9);
    assert_abs_diff_eq!(bbox.width(), width, epsilon = 1e-9);
    assert_abs_diff_eq!(bbox.height(), height, epsilon = 1e-9);
}

#[test]
fn integer_coordinates_use_format_divisor() {
    // Same digits, different decimal count: 1.5 mm vs 0.015 mm
    let four = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.2*%\nD10*\nX15000Y15000D03*\nM02*\n";
    let six = "%FSLAX26Y26*%\n%MOMM*%\n%ADD10C,0.2*%\nD10*\nX15000Y15000D03*\nM02*\n";
    assert_bbox(&parse_layer(four).unwrap().bbox, 1.4, 1.4, 0.2, 0.2);
    assert_bbox(&parse_layer(six).unwrap().bbox, -0.085, -0.085, 0.2, 0.2);
}

#[test]
fn literal_decimal_ignores_format() {
    let gerber = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,1*%\nD10*\nX1.5Y2.5D03*\nM02*\n";
    assert_bbox(&parse_layer(gerber).unwrap().bbox, 1.0, 2.0, 1.0, 1.0);
}

#[test]
fn stroke_of_ten_by_one_is_a_rectangle() {
    let gerber = "\
%FSLAX26Y26*%
%MOMM*%
%ADD10C,1*%
D10*
X0Y0D02*
X10000000Y0D01*
M02*
";
    let geo = convert(gerber, &ConvertOptions::default());
    assert_bbox(&geo.bbox, 0.0, -0.5, 10.0, 1.0);
    assert_eq!(geo.path.matches('L').count(), 3);
    assert!(geo.path.ends_with('Z'));
}

#[test]
fn unit_square_region_bbox() {
    let gerber = "\
%FSLAX24Y24*%
%MOMM*%
G01*
G36*
X0Y0D02*
X10000Y0D01*
X10000Y10000D01*
X0Y10000D01*
X0Y0D01*
G37*
M02*
";
    let geo = convert(gerber, &ConvertOptions::default());
    assert_bbox(&geo.bbox, 0.0, 0.0, 1.0, 1.0);
    assert!(!geo.path.is_empty());
}

#[test]
fn circular_flash_bbox() {
    let gerber = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,2*%\nD10*\nX30000Y40000D03*\nM02*\n";
    let geo = convert(gerber, &ConvertOptions::default());
    assert_bbox(&geo.bbox, 2.0, 3.0, 2.0, 2.0);
    assert_eq!(geo.path.matches('A').count(), 2);
}

#[test]
fn mirror_twice_is_identity() {
    let gerber = "\
%FSLAX24Y24*%
%MOMM*%
%ADD10C,0.5*%
%ADD11R,1X2*%
D10*
X0Y0D02*
X30000Y10000D01*
G03*
X20000Y20000I-10000J0D01*
D11*
X50000Y5000D03*
M02*
";
    let geo = convert(gerber, &ConvertOptions::default());
    let once = mirror_path(&geo.path, &geo.bbox);
    assert_ne!(once, geo.path);
    assert_eq!(mirror_path(&once, &geo.bbox), geo.path);
}

#[test]
fn double_clearance_restores_original() {
    let gerber = "\
%FSLAX24Y24*%
%MOMM*%
%ADD10R,2X1*%
D10*
X10000Y10000D03*
X40000Y10000D03*
M02*
";
    let plot = parse_layer(gerber).unwrap();
    let original_area = shapes_area(&plot.shapes);

    let first = compute_clearance(&ClearanceRequest::around(&plot.shapes, 1.0));
    assert!(first.inverted);

    let second = compute_clearance(&ClearanceRequest {
        traces: &first.shapes,
        plate: PlateRegion::Outline(vec![first.bbox.corners()]),
        padding: 0.0,
    });
    assert!(second.inverted);
    assert_abs_diff_eq!(shapes_area(&second.shapes), original_area, epsilon = 1e-6);
    assert_abs_diff_eq!(second.bbox.x(), plot.bbox.x(), epsilon = 1e-6);
    assert_abs_diff_eq!(second.bbox.y(), plot.bbox.y(), epsilon = 1e-6);
    assert_abs_diff_eq!(second.bbox.width(), plot.bbox.width(), epsilon = 1e-6);
    assert_abs_diff_eq!(second.bbox.height(), plot.bbox.height(), epsilon = 1e-6);
}

#[test]
fn empty_or_garbage_input_gives_empty_geometry() {
    for input in ["", "hello world", "%%%%", "garbage*more*"] {
        let geo = convert(input, &ConvertOptions::default());
        assert_eq!(geo.path, "");
        assert_bbox(&geo.bbox, 0.0, 0.0, 0.0, 0.0);
    }
    let inverted = ConvertOptions {
        invert: true,
        ..Default::default()
    };
    assert_eq!(convert("", &inverted).path, "");
}

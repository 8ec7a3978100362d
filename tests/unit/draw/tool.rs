use super::*;

#[test]
fn ids_are_stable() {
    assert_eq!(Tool::Pen.id(), "pen");
    assert_eq!(Tool::Brush.id(), "brush");
    assert_eq!(Tool::Eraser.id(), "eraser");
    assert_eq!(Tool::Geometry(GeometryShape::Arrow).id(), "arrow");
    assert_eq!(
        "square".parse::<Tool>().unwrap(),
        Tool::Geometry(GeometryShape::Square)
    );
    assert!("spray".parse::<Tool>().is_err());
}

#[test]
fn line_width_is_clamped() {
    let c = ToolConfig::default().with_line_width(1.0);
    assert_eq!(c.line_width(), MIN_LINE_WIDTH);
    let c = c.with_line_width(500.0);
    assert_eq!(c.line_width(), MAX_LINE_WIDTH);
    assert_eq!(ToolConfig::width_from_slider(0.5), 54.0);
    assert_eq!(ToolConfig::width_from_slider(2.0), MAX_LINE_WIDTH);
}

#[test]
fn derived_flags() {
    let c = ToolConfig::default();
    assert!(c.can_draw());
    assert!(!c.is_eraser());
    assert!(!c.with_tool(None).can_draw());
    assert!(c.with_tool(Some(Tool::Eraser)).is_eraser());
    assert!(
        c.with_tool(Some(Tool::Geometry(GeometryShape::Line)))
            .is_geometry()
    );
}

#[test]
fn config_deserializes_with_defaults() {
    let c: ToolConfig = serde_json::from_str(r#"{"tool":"brush","line_width":1000}"#).unwrap();
    assert_eq!(c.tool, Some(Tool::Brush));
    assert_eq!(c.line_width(), MAX_LINE_WIDTH);
    assert_eq!(c.color, Rgba8::BLACK);

    let g: ToolConfig = serde_json::from_str(r#"{"tool":{"geometry":"circle"}}"#).unwrap();
    assert_eq!(g.tool, Some(Tool::Geometry(GeometryShape::Circle)));
}

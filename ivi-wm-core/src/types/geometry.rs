//! Integer geometry used for layers, surfaces and screen areas.

use serde::{Deserialize, Serialize};

/// An integer rectangle.
///
/// Width and height are signed because layer mappings use negative
/// extents as "relative to the output" markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Same extent, anchored at the origin.
    pub const fn at_origin(&self) -> Rect {
        Rect { x: 0, y: 0, w: self.w, h: self.h }
    }

    pub fn size(&self) -> Size {
        Size::new(self.w.max(0) as u32, self.h.max(0) as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// An integer size with `u32` dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// How the layout base resolution is mapped onto the physical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Uniform scale, letterboxed and centred on the output.
    #[default]
    AspectFit,
    /// Independent horizontal and vertical stretch to fill the output.
    DisplayFit,
}

impl ScalingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingMode::AspectFit => "aspect_fit",
            ScalingMode::DisplayFit => "display_fit",
        }
    }
}

/// Computes where a layout designed for `base` lands on an output of `output` size.
///
/// Returns `None` when the base size is empty and no scale can be derived.
pub fn scale_dest_rect(base: Size, output: Size, mode: ScalingMode) -> Option<Rect> {
    if base.is_empty() {
        return None;
    }
    let rate_w = f64::from(output.width) / f64::from(base.width);
    let rate_h = f64::from(output.height) / f64::from(base.height);

    let rect = match mode {
        ScalingMode::AspectFit => {
            let scale = rate_w.min(rate_h);
            let w = (f64::from(base.width) * scale) as i32;
            let h = (f64::from(base.height) * scale) as i32;
            Rect::new(
                (output.width as i32 - w) / 2,
                (output.height as i32 - h) / 2,
                w,
                h,
            )
        }
        ScalingMode::DisplayFit => Rect::new(
            0,
            0,
            (f64::from(base.width) * rate_w) as i32,
            (f64::from(base.height) * rate_h) as i32,
        ),
    };
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BASE: Size = Size::new(1080, 1920);

    #[rstest]
    #[case(Size::new(1080, 1920), ScalingMode::AspectFit, Rect::new(0, 0, 1080, 1920))]
    #[case(Size::new(1920, 1080), ScalingMode::AspectFit, Rect::new(656, 0, 607, 1080))]
    #[case(Size::new(540, 960), ScalingMode::AspectFit, Rect::new(0, 0, 540, 960))]
    #[case(Size::new(1920, 1080), ScalingMode::DisplayFit, Rect::new(0, 0, 1920, 1080))]
    fn scales_base_onto_output(#[case] output: Size, #[case] mode: ScalingMode, #[case] expected: Rect) {
        assert_eq!(scale_dest_rect(BASE, output, mode), Some(expected));
    }

    #[test]
    fn empty_base_cannot_scale() {
        assert_eq!(scale_dest_rect(Size::new(0, 1920), BASE, ScalingMode::AspectFit), None);
    }

    #[test]
    fn scaling_mode_serde_names() {
        let mode: ScalingMode = serde_json::from_str("\"display_fit\"").unwrap();
        assert_eq!(mode, ScalingMode::DisplayFit);
        assert_eq!(ScalingMode::default().as_str(), "aspect_fit");
    }

    #[test]
    fn rect_helpers() {
        let r = Rect::new(10, 218, 1080, 744);
        assert_eq!(r.at_origin(), Rect::new(0, 0, 1080, 744));
        assert_eq!(r.size(), Size::new(1080, 744));
        assert!(Rect::new(0, 760, -1, 400).is_empty());
    }
}

/// Header every effect body is compiled against.
pub const COMMON_WGSL: &str = include_str!("../../shaders/common.wgsl");

pub const PLAIN_TEXTURE: &str = include_str!("../../shaders/effects/plain_texture.wgsl");
pub const BOX_BLUR: &str = include_str!("../../shaders/effects/box_blur.wgsl");
pub const GAUSSIAN_BLUR: &str = include_str!("../../shaders/effects/gaussian_blur.wgsl");
pub const GRAYSCALE: &str = include_str!("../../shaders/effects/grayscale.wgsl");
pub const INVERT: &str = include_str!("../../shaders/effects/invert.wgsl");
pub const SEPIA: &str = include_str!("../../shaders/effects/sepia.wgsl");
pub const SHARPEN_FILTER: &str = include_str!("../../shaders/effects/sharpen_filter.wgsl");
pub const PREWITT_OPERATOR: &str = include_str!("../../shaders/effects/prewitt_operator.wgsl");
pub const SOBEL_FILTER: &str = include_str!("../../shaders/effects/sobel_filter.wgsl");
pub const VIGNETTE: &str = include_str!("../../shaders/effects/vignette.wgsl");
pub const PIXELATE_FILTER: &str = include_str!("../../shaders/effects/pixelate_filter.wgsl");

use crate::foundation::core::{Rect, Size, Vec2};
use crate::texture::Texture;

/// Shared per-pass uniform block, laid out as six `vec4<f32>`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterUniforms {
    /// Source width/height in logical units and their reciprocals.
    pub input_size: [f32; 4],
    /// Source width/height in device pixels and their reciprocals.
    pub input_pixel: [f32; 4],
    /// Valid sampling region in normalized coordinates, inset by half a texel.
    pub input_clamp: [f32; 4],
    /// Quad origin and size in output logical units.
    pub output_frame: [f32; 4],
    /// Root-relative frame in device pixels.
    pub global_frame: [f32; 4],
    /// Output size in logical units, then `-1` for the root surface and `1` otherwise.
    pub output_texture: [f32; 4],
}

impl FilterUniforms {
    pub const SIZE: usize = 6 * 16;

    pub fn new(
        input: &Texture,
        output_origin: Vec2,
        global_frame: Rect,
        output_size: Size,
        output_is_root: bool,
    ) -> Self {
        let src = &input.source;
        let sw = src.width() as f32;
        let sh = src.height() as f32;
        let input_size = [sw, sh, 1.0 / sw, 1.0 / sh];

        let pw = src.pixel_width as f32;
        let ph = src.pixel_height as f32;
        let input_pixel = [pw, ph, 1.0 / pw, 1.0 / ph];

        let frame_w = input.frame.width() as f32;
        let frame_h = input.frame.height() as f32;
        let input_clamp = [
            0.5 * input_pixel[2],
            0.5 * input_pixel[3],
            frame_w * input_size[2] - 0.5 * input_pixel[2],
            frame_h * input_size[3] - 0.5 * input_pixel[3],
        ];

        Self {
            input_size,
            input_pixel,
            input_clamp,
            output_frame: [
                output_origin.x as f32,
                output_origin.y as f32,
                frame_w,
                frame_h,
            ],
            global_frame: [
                global_frame.x0 as f32,
                global_frame.y0 as f32,
                global_frame.width() as f32,
                global_frame.height() as f32,
            ],
            output_texture: [
                output_size.width as f32,
                output_size.height as f32,
                if output_is_root { -1.0 } else { 1.0 },
                0.0,
            ],
        }
    }

    /// Little-endian bytes in declaration order, ready for a uniform buffer.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let blocks = [
            self.input_size,
            self.input_pixel,
            self.input_clamp,
            self.output_frame,
            self.global_frame,
            self.output_texture,
        ];
        for (i, v) in blocks.iter().flatten().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/system/uniforms.rs"]
mod tests;

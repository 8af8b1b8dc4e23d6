use std::fs;
use std::path::Path;
use std::rc::Rc;

use log::{debug, error, info};

use crate::engine::graphics::context::GraphicsContext;
use crate::engine::graphics::driver::{GraphicsDriver, MagFilter, MinFilter, TextureParameter, WrapMode};
use crate::engine::graphics::error::{GraphicsError, GraphicsResult};
use crate::engine::graphics::pixels::PixelBuffer;

/// Sampling configuration chosen when a texture is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    /// Applied to both the S and T axes.
    pub wrap: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub base_level: i32,
    pub max_level: i32,
    pub flip_vertically: bool,
}

impl TextureOptions {
    /// Edge-clamped, trilinear minification, sampling only the base level.
    pub fn clamped() -> Self {
        Self {
            wrap: WrapMode::ClampToEdge,
            min_filter: MinFilter::LinearMipmapLinear,
            mag_filter: MagFilter::Linear,
            base_level: 0,
            max_level: 0,
            flip_vertically: false,
        }
    }

    /// Tiling with nearest-neighbour magnification across the whole chain.
    pub fn repeating() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Nearest,
            base_level: 0,
            max_level: 1000,
            flip_vertically: false,
        }
    }

    fn parameters(&self) -> [TextureParameter; 6] {
        [
            TextureParameter::WrapS(self.wrap),
            TextureParameter::WrapT(self.wrap),
            TextureParameter::MinFilter(self.min_filter),
            TextureParameter::MagFilter(self.mag_filter),
            TextureParameter::BaseLevel(self.base_level),
            TextureParameter::MaxLevel(self.max_level),
        ]
    }
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self::clamped()
    }
}

/// A 2D RGBA8 texture with a complete mip chain.
pub struct Texture<D: GraphicsDriver> {
    context: Rc<GraphicsContext<D>>,
    handle: D::Texture,
    width: u32,
    height: u32,
    mip_levels: u32,
    options: TextureOptions,
}

impl<D: GraphicsDriver> Texture<D> {
    /// Loads and decodes an image file, then uploads it.
    pub fn create(
        context: &Rc<GraphicsContext<D>>,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> GraphicsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            error!("Failed to find texture path {}", path.display());
            return Err(GraphicsError::missing(path));
        }
        let bytes = fs::read(path).map_err(|source| GraphicsError::Io { path: path.to_path_buf(), source })?;
        let mut pixels = PixelBuffer::decode(&bytes).map_err(|source| {
            error!("Failed to decode {}: {}", path.display(), source);
            GraphicsError::Decode { path: path.to_path_buf(), source }
        })?;
        if options.flip_vertically {
            pixels.flip_vertically();
        }
        info!("[texture] Loaded texture: {}x{} from {}", pixels.width(), pixels.height(), path.display());

        Self::from_pixels(context, &pixels, options)
    }

    /// Uploads already decoded pixels as the base level, applies `options`
    /// and generates the rest of the mip chain.
    ///
    /// The upload goes through texture unit 0, so this replaces whatever was
    /// bound there.
    pub fn from_pixels(
        context: &Rc<GraphicsContext<D>>,
        pixels: &PixelBuffer,
        options: TextureOptions,
    ) -> GraphicsResult<Self> {
        let driver = context.driver();
        let handle = driver
            .create_texture()
            .map_err(GraphicsError::allocation("texture"))?;
        let texture = Self {
            context: Rc::clone(context),
            handle,
            width: pixels.width(),
            height: pixels.height(),
            mip_levels: pixels.mip_level_count(),
            options,
        };

        texture.bind(0);
        driver.tex_image_2d_rgba8(0, pixels.width(), pixels.height(), pixels.as_bytes());
        for parameter in options.parameters() {
            driver.tex_parameter_2d(parameter);
        }
        driver.generate_mipmap_2d();
        debug!("[texture] Uploaded {:?} with {} mip levels", handle, texture.mip_levels);

        Ok(texture)
    }

    /// Makes this the 2D texture of `unit` (0-based).
    pub fn bind(&self, unit: u32) {
        self.context.bind_texture(unit, Some(self.handle));
    }

    pub fn handle(&self) -> D::Texture {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn options(&self) -> TextureOptions {
        self.options
    }

    pub fn dispose(self) {}
}

impl<D: GraphicsDriver> Drop for Texture<D> {
    fn drop(&mut self) {
        debug!("[texture] Deleting {:?}", self.handle);
        self.context.delete_texture(self.handle);
    }
}

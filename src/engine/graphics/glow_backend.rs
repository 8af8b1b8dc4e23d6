//! [`GraphicsDriver`] over a live OpenGL 3.3 core context loaded by `glow`.
//!
//! Every call is a raw GL entry point. The context must be current on the
//! calling thread for as long as this driver is used, which `TutorialApp`
//! guarantees by creating and dropping it alongside the glutin surface.

use glow::HasContext;

use crate::engine::graphics::driver::{
    AttribType, BufferKind, GraphicsDriver, IndexType, MagFilter, MinFilter, Primitive,
    ShaderStage, TextureParameter, WrapMode,
};

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn buffer_target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::VertexData => glow::ARRAY_BUFFER,
        BufferKind::IndexData => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn attrib_type(ty: AttribType) -> u32 {
    match ty {
        AttribType::Byte => glow::BYTE,
        AttribType::UnsignedByte => glow::UNSIGNED_BYTE,
        AttribType::Short => glow::SHORT,
        AttribType::UnsignedShort => glow::UNSIGNED_SHORT,
        AttribType::Int => glow::INT,
        AttribType::UnsignedInt => glow::UNSIGNED_INT,
        AttribType::Float => glow::FLOAT,
    }
}

fn index_type(ty: IndexType) -> u32 {
    match ty {
        IndexType::UnsignedByte => glow::UNSIGNED_BYTE,
        IndexType::UnsignedShort => glow::UNSIGNED_SHORT,
        IndexType::UnsignedInt => glow::UNSIGNED_INT,
    }
}

fn primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Points => glow::POINTS,
        Primitive::Lines => glow::LINES,
        Primitive::LineStrip => glow::LINE_STRIP,
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        Primitive::TriangleFan => glow::TRIANGLE_FAN,
    }
}

fn wrap_mode(mode: WrapMode) -> i32 {
    (match mode {
        WrapMode::Repeat => glow::REPEAT,
        WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
        WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn min_filter(filter: MinFilter) -> i32 {
    (match filter {
        MinFilter::Nearest => glow::NEAREST,
        MinFilter::Linear => glow::LINEAR,
        MinFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        MinFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        MinFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        MinFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn mag_filter(filter: MagFilter) -> i32 {
    (match filter {
        MagFilter::Nearest => glow::NEAREST,
        MagFilter::Linear => glow::LINEAR,
    }) as i32
}

impl GraphicsDriver for glow::Context {
    type Program = glow::Program;
    type Shader = glow::Shader;
    type Texture = glow::Texture;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type UniformLocation = glow::UniformLocation;

    fn create_program(&self) -> Result<glow::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        unsafe { HasContext::create_shader(self, shader_stage(stage)) }
    }

    fn shader_source(&self, shader: glow::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: glow::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: glow::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn link_program(&self, program: glow::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: glow::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }

    fn uniform_1_i32(&self, location: &glow::UniformLocation, value: i32) {
        unsafe { HasContext::uniform_1_i32(self, Some(location), value) }
    }

    fn uniform_1_f32(&self, location: &glow::UniformLocation, value: f32) {
        unsafe { HasContext::uniform_1_f32(self, Some(location), value) }
    }

    fn uniform_2_f32(&self, location: &glow::UniformLocation, x: f32, y: f32) {
        unsafe { HasContext::uniform_2_f32(self, Some(location), x, y) }
    }

    fn uniform_3_f32(&self, location: &glow::UniformLocation, x: f32, y: f32, z: f32) {
        unsafe { HasContext::uniform_3_f32(self, Some(location), x, y, z) }
    }

    fn uniform_4_f32(&self, location: &glow::UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        unsafe { HasContext::uniform_4_f32(self, Some(location), x, y, z, w) }
    }

    fn uniform_matrix_4_f32(&self, location: &glow::UniformLocation, columns: &[f32; 16]) {
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, Some(location), false, columns) }
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        unsafe { HasContext::create_texture(self) }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn bind_texture_2d(&self, texture: Option<glow::Texture>) {
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d_rgba8(&self, level: i32, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                level,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            )
        }
    }

    fn tex_parameter_2d(&self, parameter: TextureParameter) {
        let (name, value) = match parameter {
            TextureParameter::WrapS(mode) => (glow::TEXTURE_WRAP_S, wrap_mode(mode)),
            TextureParameter::WrapT(mode) => (glow::TEXTURE_WRAP_T, wrap_mode(mode)),
            TextureParameter::MinFilter(filter) => (glow::TEXTURE_MIN_FILTER, min_filter(filter)),
            TextureParameter::MagFilter(filter) => (glow::TEXTURE_MAG_FILTER, mag_filter(filter)),
            TextureParameter::BaseLevel(level) => (glow::TEXTURE_BASE_LEVEL, level),
            TextureParameter::MaxLevel(level) => (glow::TEXTURE_MAX_LEVEL, level),
        };
        unsafe { HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, name, value) }
    }

    fn generate_mipmap_2d(&self) {
        unsafe { HasContext::generate_mipmap(self, glow::TEXTURE_2D) }
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<glow::Buffer>) {
        unsafe { HasContext::bind_buffer(self, buffer_target(kind), buffer) }
    }

    fn buffer_data_static(&self, kind: BufferKind, data: &[u8]) {
        unsafe { HasContext::buffer_data_u8_slice(self, buffer_target(kind), data, glow::STATIC_DRAW) }
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        unsafe { HasContext::create_vertex_array(self) }
    }

    fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        components: i32,
        ty: AttribType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(self, index, components, attrib_type(ty), normalized, stride, offset)
        }
    }

    fn draw_elements(&self, mode: Primitive, count: i32, ty: IndexType, offset: i32) {
        unsafe { HasContext::draw_elements(self, primitive(mode), count, index_type(ty), offset) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear_color_buffer(&self) {
        unsafe { HasContext::clear(self, glow::COLOR_BUFFER_BIT) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn set_alpha_blending(&self, enabled: bool) {
        unsafe {
            if enabled {
                HasContext::enable(self, glow::BLEND);
                HasContext::blend_func(self, glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                HasContext::disable(self, glow::BLEND);
            }
        }
    }
}

//! A software [`GraphicsDriver`] that keeps every object in host memory.
//!
//! It behaves like a strict core-profile context: objects must be bound
//! before they are modified, invalid calls push onto a GL-style error queue
//! instead of panicking, and draw calls are resolved down to the concrete
//! index list and texture bindings they would consume. Every mutating call is
//! appended to a call log so tests can assert on sequences.

pub mod glsl;

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::engine::graphics::driver::{
    AttribType, BufferKind, GraphicsDriver, IndexType, MagFilter, MinFilter, Primitive,
    ShaderStage, TextureParameter, WrapMode,
};
use glsl::ShaderInterface;

pub const MAX_TEXTURE_UNITS: u32 = 32;
pub const MAX_VERTEX_ATTRIBS: u32 = 16;

/// Location handed out by [`HeadlessDriver::uniform_location`]. Unlike a raw
/// GL location it remembers which program issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessUniformLocation {
    pub program: u32,
    pub location: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

impl UniformData {
    fn accepted_by(&self, ty: &str) -> bool {
        match self {
            UniformData::Int(_) => ty == "int" || ty == "bool" || glsl::is_sampler(ty),
            UniformData::Float(_) => ty == "float" || ty == "bool",
            UniformData::Vec2(_) => ty == "vec2",
            UniformData::Vec3(_) => ty == "vec3",
            UniformData::Vec4(_) => ty == "vec4",
            UniformData::Mat4(_) => ty == "mat4" || ty == "mat4x4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlErrorCode {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
}

/// An error the driver would have reported through `glGetError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlError {
    pub code: GlErrorCode,
    pub call: &'static str,
}

/// Every state-changing call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    CreateProgram(u32),
    DeleteProgram(u32),
    CreateShader(ShaderStage, u32),
    ShaderSource(u32),
    CompileShader(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    DeleteShader(u32),
    LinkProgram(u32),
    UseProgram(Option<u32>),
    Uniform { location: HeadlessUniformLocation, value: UniformData },
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture2d(Option<u32>),
    TexImage2d { level: i32, width: u32, height: u32 },
    TexParameter(TextureParameter),
    GenerateMipmap,
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(BufferKind, Option<u32>),
    BufferData { kind: BufferKind, len: usize },
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(Option<u32>),
    EnableVertexAttribArray(u32),
    VertexAttribPointer { index: u32, components: i32, ty: AttribType, normalized: bool, stride: i32, offset: i32 },
    DrawElements { primitive: Primitive, count: i32, index_type: IndexType, offset: i32 },
    ClearColor([f32; 4]),
    Clear,
    Viewport([i32; 4]),
    SetAlphaBlending(bool),
}

#[derive(Debug, Clone)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: Option<ShaderInterface>,
    info_log: String,
    delete_pending: bool,
}

#[derive(Debug, Clone)]
pub struct UniformSlot {
    pub ty: String,
    pub location: i32,
    pub value: Option<UniformData>,
}

#[derive(Debug, Clone, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    info_log: String,
    uniforms: BTreeMap<String, UniformSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub base_level: i32,
    pub max_level: i32,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            base_level: 0,
            max_level: 1000,
        }
    }
}

/// Host-side copy of a texture object.
#[derive(Debug, Clone, Default)]
pub struct TextureSnapshot {
    pub levels: Vec<MipLevel>,
    pub sampler: SamplerState,
}

impl TextureSnapshot {
    pub fn base(&self) -> Option<&MipLevel> {
        self.levels.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribPointer {
    pub enabled: bool,
    pub components: i32,
    pub ty: AttribType,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
    pub buffer: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexArraySnapshot {
    pub element_buffer: Option<u32>,
    pub attributes: BTreeMap<u32, AttribPointer>,
}

/// A draw call resolved against the state that was bound when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub program: u32,
    pub vertex_array: u32,
    pub indices: Vec<u32>,
    /// Vertices addressable through every enabled attribute.
    pub vertex_count: usize,
    /// Texture bound to the 2D target of each unit.
    pub textures: BTreeMap<u32, u32>,
    pub uniforms: BTreeMap<String, UniformData>,
}

/// Driver-global binding state.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState {
    pub current_program: Option<u32>,
    pub bound_vertex_array: Option<u32>,
    pub array_buffer: Option<u32>,
    /// Element binding used while no vertex array is bound.
    pub element_buffer: Option<u32>,
    pub active_unit: u32,
    pub texture_units: BTreeMap<u32, u32>,
    pub clear_color: [f32; 4],
    pub viewport: [i32; 4],
    pub alpha_blending: bool,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            current_program: None,
            bound_vertex_array: None,
            array_buffer: None,
            element_buffer: None,
            active_unit: 0,
            texture_units: BTreeMap::new(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            viewport: [0, 0, 0, 0],
            alpha_blending: false,
        }
    }
}

#[derive(Default)]
struct HeadlessState {
    next_name: u32,
    object_limit: Option<usize>,
    programs: HashMap<u32, ProgramObject>,
    shaders: HashMap<u32, ShaderObject>,
    textures: HashMap<u32, TextureSnapshot>,
    buffers: HashMap<u32, Vec<u8>>,
    vertex_arrays: HashMap<u32, VertexArraySnapshot>,
    bindings: BindingState,
    errors: Vec<GlError>,
    calls: Vec<DriverCall>,
    draws: Vec<DrawCall>,
    frames_cleared: usize,
}

impl HeadlessState {
    fn live_objects(&self) -> usize {
        self.programs.len() + self.shaders.len() + self.textures.len() + self.buffers.len() + self.vertex_arrays.len()
    }

    fn allocate(&mut self) -> Result<u32, String> {
        if let Some(limit) = self.object_limit {
            if self.live_objects() >= limit {
                return Err("out of memory".to_string());
            }
        }
        self.next_name += 1;
        Ok(self.next_name)
    }

    fn fail(&mut self, code: GlErrorCode, call: &'static str) {
        debug!("headless: {:?} in {}", code, call);
        self.errors.push(GlError { code, call });
    }

    fn bound_texture(&self) -> Option<u32> {
        self.bindings.texture_units.get(&self.bindings.active_unit).copied()
    }

    fn element_buffer(&self) -> Option<u32> {
        match self.bindings.bound_vertex_array {
            Some(vao) => self.vertex_arrays.get(&vao).and_then(|v| v.element_buffer),
            None => self.bindings.element_buffer,
        }
    }

    fn is_attached(&self, shader: u32) -> bool {
        self.programs.values().any(|p| p.attached.contains(&shader))
    }

    fn release_shader_if_orphaned(&mut self, shader: u32) {
        let pending = self.shaders.get(&shader).is_some_and(|s| s.delete_pending);
        if pending && !self.is_attached(shader) {
            self.shaders.remove(&shader);
        }
    }

    fn write_uniform(&mut self, location: &HeadlessUniformLocation, value: UniformData) {
        self.calls.push(DriverCall::Uniform { location: *location, value });
        if self.bindings.current_program != Some(location.program) {
            self.fail(GlErrorCode::InvalidOperation, "glUniform");
            return;
        }
        let slot = self
            .programs
            .get_mut(&location.program)
            .and_then(|p| p.uniforms.values_mut().find(|slot| slot.location == location.location));
        let written = match slot {
            Some(slot) if value.accepted_by(&slot.ty) => {
                slot.value = Some(value);
                true
            }
            _ => false,
        };
        if !written {
            self.fail(GlErrorCode::InvalidOperation, "glUniform");
        }
    }

    fn link(&self, program: u32) -> Result<BTreeMap<String, UniformSlot>, String> {
        let attached = self.programs.get(&program).map(|p| p.attached.clone()).unwrap_or_default();
        let mut vertex: Option<&ShaderInterface> = None;
        let mut fragment: Option<&ShaderInterface> = None;
        for shader in &attached {
            let Some(object) = self.shaders.get(shader) else { continue };
            let Some(interface) = object.compiled.as_ref() else {
                return Err(format!("error: linking with uncompiled {} shader", object.stage));
            };
            let slot = match object.stage {
                ShaderStage::Vertex => &mut vertex,
                ShaderStage::Fragment => &mut fragment,
            };
            if slot.is_some() {
                return Err(format!("error: more than one {} shader attached", object.stage));
            }
            *slot = Some(interface);
        }
        let vertex = vertex.ok_or_else(|| "error: program lacks a vertex shader".to_string())?;
        let fragment = fragment.ok_or_else(|| "error: program lacks a fragment shader".to_string())?;

        for input in &fragment.inputs {
            match vertex.outputs.iter().find(|out| out.name == input.name) {
                Some(out) if out.ty == input.ty => {}
                Some(out) => {
                    return Err(format!(
                        "error: `{}' declared as type `{}' in vertex shader and `{}' in fragment shader",
                        input.name, out.ty, input.ty
                    ))
                }
                None => {
                    return Err(format!(
                        "error: fragment shader input `{}' has no matching vertex shader output",
                        input.name
                    ))
                }
            }
        }

        let mut declared: BTreeMap<String, (String, bool)> = BTreeMap::new();
        for uniform in vertex.uniforms.iter().chain(fragment.uniforms.iter()) {
            match declared.get_mut(&uniform.name) {
                Some((ty, active)) => {
                    if *ty != uniform.ty {
                        return Err(format!(
                            "error: uniform `{}' declared as type `{}' and `{}'",
                            uniform.name, ty, uniform.ty
                        ));
                    }
                    *active |= uniform.active;
                }
                None => {
                    declared.insert(uniform.name.clone(), (uniform.ty.clone(), uniform.active));
                }
            }
        }
        let uniforms = declared
            .into_iter()
            .filter(|(_, (_, active))| *active)
            .enumerate()
            .map(|(location, (name, (ty, _)))| {
                (name, UniformSlot { ty, location: location as i32, value: None })
            })
            .collect();
        Ok(uniforms)
    }

    fn resolve_draw(
        &self,
        primitive: Primitive,
        count: i32,
        index_type: IndexType,
        offset: i32,
    ) -> Result<DrawCall, GlErrorCode> {
        let program = self
            .bindings
            .current_program
            .filter(|p| self.programs.get(p).is_some_and(|p| p.linked))
            .ok_or(GlErrorCode::InvalidOperation)?;
        let vertex_array = self.bindings.bound_vertex_array.ok_or(GlErrorCode::InvalidOperation)?;
        let vao = self.vertex_arrays.get(&vertex_array).ok_or(GlErrorCode::InvalidOperation)?;
        let elements = vao
            .element_buffer
            .and_then(|b| self.buffers.get(&b))
            .ok_or(GlErrorCode::InvalidOperation)?;
        if count < 0 || offset < 0 {
            return Err(GlErrorCode::InvalidValue);
        }

        let size = index_type.size_in_bytes();
        let start = offset as usize;
        let end = start + count as usize * size;
        let bytes = elements.get(start..end).ok_or(GlErrorCode::InvalidOperation)?;
        let indices = bytes
            .chunks_exact(size)
            .map(|chunk| match index_type {
                IndexType::UnsignedByte => chunk[0] as u32,
                IndexType::UnsignedShort => u16::from_ne_bytes([chunk[0], chunk[1]]) as u32,
                IndexType::UnsignedInt => u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            })
            .collect();

        let vertex_count = vao
            .attributes
            .values()
            .filter(|a| a.enabled)
            .map(|a| {
                let len = a.buffer.and_then(|b| self.buffers.get(&b)).map_or(0, Vec::len);
                let element = a.components as usize * a.ty.size_in_bytes();
                let stride = if a.stride == 0 { element } else { a.stride as usize };
                let first = a.offset as usize;
                if len < first + element {
                    0
                } else {
                    (len - first - element) / stride + 1
                }
            })
            .min()
            .unwrap_or(0);

        let uniforms = self
            .programs
            .get(&program)
            .map(|p| {
                p.uniforms
                    .iter()
                    .filter_map(|(name, slot)| slot.value.map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(DrawCall {
            primitive,
            program,
            vertex_array,
            indices,
            vertex_count,
            textures: self.bindings.texture_units.clone(),
            uniforms,
        })
    }
}

/// Box-filters one level down to the next, clamping odd edges.
fn downsample(level: &MipLevel) -> MipLevel {
    let width = (level.width / 2).max(1);
    let height = (level.height / 2).max(1);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let mut sum = [0u32; 4];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (x * 2 + dx).min(level.width - 1);
                let sy = (y * 2 + dy).min(level.height - 1);
                let i = ((sy * level.width + sx) * 4) as usize;
                for c in 0..4 {
                    sum[c] += level.pixels[i + c] as u32;
                }
            }
            pixels.extend(sum.iter().map(|s| (s / 4) as u8));
        }
    }
    MipLevel { width, height, pixels }
}

/// Software graphics driver for tests and headless runs.
#[derive(Default)]
pub struct HeadlessDriver {
    state: RefCell<HeadlessState>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that refuses to allocate once `limit` objects are alive.
    pub fn with_object_limit(limit: usize) -> Self {
        let driver = Self::default();
        driver.state.borrow_mut().object_limit = Some(limit);
        driver
    }

    pub fn state(&self) -> BindingState {
        self.state.borrow().bindings.clone()
    }

    pub fn calls(&self) -> Ref<'_, [DriverCall]> {
        Ref::map(self.state.borrow(), |s| s.calls.as_slice())
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn draws(&self) -> Ref<'_, [DrawCall]> {
        Ref::map(self.state.borrow(), |s| s.draws.as_slice())
    }

    /// Drains the error queue, like repeated `glGetError` calls.
    pub fn take_errors(&self) -> Vec<GlError> {
        std::mem::take(&mut self.state.borrow_mut().errors)
    }

    pub fn frames_cleared(&self) -> usize {
        self.state.borrow().frames_cleared
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn is_linked(&self, program: u32) -> bool {
        self.state.borrow().programs.get(&program).is_some_and(|p| p.linked)
    }

    pub fn program_uniforms(&self, program: u32) -> Option<BTreeMap<String, UniformSlot>> {
        self.state.borrow().programs.get(&program).map(|p| p.uniforms.clone())
    }

    pub fn uniform_value(&self, program: u32, name: &str) -> Option<UniformData> {
        self.state.borrow().programs.get(&program)?.uniforms.get(name)?.value
    }

    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn texture(&self, texture: u32) -> Option<TextureSnapshot> {
        self.state.borrow().textures.get(&texture).cloned()
    }

    pub fn vertex_array(&self, vertex_array: u32) -> Option<VertexArraySnapshot> {
        self.state.borrow().vertex_arrays.get(&vertex_array).cloned()
    }

    pub fn shader_source_of(&self, shader: u32) -> Option<String> {
        self.state.borrow().shaders.get(&shader).map(|s| s.source.clone())
    }
}

impl GraphicsDriver for HeadlessDriver {
    type Program = u32;
    type Shader = u32;
    type Texture = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = HeadlessUniformLocation;

    fn create_program(&self) -> Result<u32, String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let name = state.allocate()?;
        state.programs.insert(name, ProgramObject::default());
        state.calls.push(DriverCall::CreateProgram(name));
        Ok(name)
    }

    fn delete_program(&self, program: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DeleteProgram(program));
        let Some(object) = state.programs.remove(&program) else {
            state.fail(GlErrorCode::InvalidValue, "glDeleteProgram");
            return;
        };
        if state.bindings.current_program == Some(program) {
            state.bindings.current_program = None;
        }
        for shader in object.attached {
            state.release_shader_if_orphaned(shader);
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let name = state.allocate()?;
        state.shaders.insert(
            name,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: None,
                info_log: String::new(),
                delete_pending: false,
            },
        );
        state.calls.push(DriverCall::CreateShader(stage, name));
        Ok(name)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::ShaderSource(shader));
        match state.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_string(),
            None => state.fail(GlErrorCode::InvalidValue, "glShaderSource"),
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::CompileShader(shader));
        let Some(object) = state.shaders.get_mut(&shader) else {
            state.fail(GlErrorCode::InvalidValue, "glCompileShader");
            return;
        };
        match glsl::compile(object.stage, &object.source) {
            Ok(interface) => {
                object.compiled = Some(interface);
                object.info_log.clear();
            }
            Err(log) => {
                object.compiled = None;
                object.info_log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state.borrow().shaders.get(&shader).is_some_and(|s| s.compiled.is_some())
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state.borrow().shaders.get(&shader).map(|s| s.info_log.clone()).unwrap_or_default()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::AttachShader { program, shader });
        if !state.shaders.contains_key(&shader) {
            state.fail(GlErrorCode::InvalidValue, "glAttachShader");
            return;
        }
        let attached = state.programs.get_mut(&program).map(|object| {
            if object.attached.contains(&shader) {
                false
            } else {
                object.attached.push(shader);
                true
            }
        });
        match attached {
            Some(true) => {}
            Some(false) => state.fail(GlErrorCode::InvalidOperation, "glAttachShader"),
            None => state.fail(GlErrorCode::InvalidValue, "glAttachShader"),
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DetachShader { program, shader });
        let detached = match state.programs.get_mut(&program) {
            Some(object) => {
                let before = object.attached.len();
                object.attached.retain(|s| *s != shader);
                before != object.attached.len()
            }
            None => false,
        };
        if !detached {
            state.fail(GlErrorCode::InvalidOperation, "glDetachShader");
            return;
        }
        state.release_shader_if_orphaned(shader);
    }

    fn delete_shader(&self, shader: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DeleteShader(shader));
        match state.shaders.get_mut(&shader) {
            Some(object) => object.delete_pending = true,
            None => {
                state.fail(GlErrorCode::InvalidValue, "glDeleteShader");
                return;
            }
        }
        state.release_shader_if_orphaned(shader);
    }

    fn link_program(&self, program: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::LinkProgram(program));
        if !state.programs.contains_key(&program) {
            state.fail(GlErrorCode::InvalidValue, "glLinkProgram");
            return;
        }
        let result = state.link(program);
        if let Some(object) = state.programs.get_mut(&program) {
            match result {
                Ok(uniforms) => {
                    object.linked = true;
                    object.info_log.clear();
                    object.uniforms = uniforms;
                }
                Err(log) => {
                    object.linked = false;
                    object.info_log = log;
                    object.uniforms.clear();
                }
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.is_linked(program)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state.borrow().programs.get(&program).map(|p| p.info_log.clone()).unwrap_or_default()
    }

    fn use_program(&self, program: Option<u32>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::UseProgram(program));
        if let Some(program) = program {
            if !state.programs.get(&program).is_some_and(|p| p.linked) {
                state.fail(GlErrorCode::InvalidOperation, "glUseProgram");
                return;
            }
        }
        state.bindings.current_program = program;
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<HeadlessUniformLocation> {
        let state = self.state.borrow();
        let slot = state.programs.get(&program)?.uniforms.get(name)?;
        Some(HeadlessUniformLocation { program, location: slot.location })
    }

    fn uniform_1_i32(&self, location: &HeadlessUniformLocation, value: i32) {
        self.state.borrow_mut().write_uniform(location, UniformData::Int(value));
    }

    fn uniform_1_f32(&self, location: &HeadlessUniformLocation, value: f32) {
        self.state.borrow_mut().write_uniform(location, UniformData::Float(value));
    }

    fn uniform_2_f32(&self, location: &HeadlessUniformLocation, x: f32, y: f32) {
        self.state.borrow_mut().write_uniform(location, UniformData::Vec2([x, y]));
    }

    fn uniform_3_f32(&self, location: &HeadlessUniformLocation, x: f32, y: f32, z: f32) {
        self.state.borrow_mut().write_uniform(location, UniformData::Vec3([x, y, z]));
    }

    fn uniform_4_f32(&self, location: &HeadlessUniformLocation, x: f32, y: f32, z: f32, w: f32) {
        self.state.borrow_mut().write_uniform(location, UniformData::Vec4([x, y, z, w]));
    }

    fn uniform_matrix_4_f32(&self, location: &HeadlessUniformLocation, columns: &[f32; 16]) {
        self.state.borrow_mut().write_uniform(location, UniformData::Mat4(*columns));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let name = state.allocate()?;
        state.textures.insert(name, TextureSnapshot::default());
        state.calls.push(DriverCall::CreateTexture(name));
        Ok(name)
    }

    fn delete_texture(&self, texture: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DeleteTexture(texture));
        if state.textures.remove(&texture).is_none() {
            state.fail(GlErrorCode::InvalidValue, "glDeleteTextures");
            return;
        }
        state.bindings.texture_units.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&self, unit: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::ActiveTexture(unit));
        if unit >= MAX_TEXTURE_UNITS {
            state.fail(GlErrorCode::InvalidEnum, "glActiveTexture");
            return;
        }
        state.bindings.active_unit = unit;
    }

    fn bind_texture_2d(&self, texture: Option<u32>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::BindTexture2d(texture));
        let unit = state.bindings.active_unit;
        match texture {
            Some(texture) if !state.textures.contains_key(&texture) => {
                state.fail(GlErrorCode::InvalidOperation, "glBindTexture");
            }
            Some(texture) => {
                state.bindings.texture_units.insert(unit, texture);
            }
            None => {
                state.bindings.texture_units.remove(&unit);
            }
        }
    }

    fn tex_image_2d_rgba8(&self, level: i32, width: u32, height: u32, pixels: &[u8]) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::TexImage2d { level, width, height });
        let Some(texture) = state.bound_texture() else {
            state.fail(GlErrorCode::InvalidOperation, "glTexImage2D");
            return;
        };
        if level != 0 || pixels.len() != (width as usize) * (height as usize) * 4 {
            state.fail(GlErrorCode::InvalidValue, "glTexImage2D");
            return;
        }
        if let Some(object) = state.textures.get_mut(&texture) {
            object.levels = vec![MipLevel { width, height, pixels: pixels.to_vec() }];
        }
    }

    fn tex_parameter_2d(&self, parameter: TextureParameter) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::TexParameter(parameter));
        let Some(texture) = state.bound_texture() else {
            state.fail(GlErrorCode::InvalidOperation, "glTexParameter");
            return;
        };
        if matches!(parameter, TextureParameter::BaseLevel(l) | TextureParameter::MaxLevel(l) if l < 0) {
            state.fail(GlErrorCode::InvalidValue, "glTexParameter");
            return;
        }
        if let Some(object) = state.textures.get_mut(&texture) {
            let sampler = &mut object.sampler;
            match parameter {
                TextureParameter::WrapS(mode) => sampler.wrap_s = mode,
                TextureParameter::WrapT(mode) => sampler.wrap_t = mode,
                TextureParameter::MinFilter(filter) => sampler.min_filter = filter,
                TextureParameter::MagFilter(filter) => sampler.mag_filter = filter,
                TextureParameter::BaseLevel(level) => sampler.base_level = level,
                TextureParameter::MaxLevel(level) => sampler.max_level = level,
            }
        }
    }

    fn generate_mipmap_2d(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::GenerateMipmap);
        let Some(texture) = state.bound_texture() else {
            state.fail(GlErrorCode::InvalidOperation, "glGenerateMipmap");
            return;
        };
        let base = state.textures.get(&texture).and_then(|t| t.levels.first().cloned());
        let Some(base) = base else {
            state.fail(GlErrorCode::InvalidOperation, "glGenerateMipmap");
            return;
        };
        let mut levels = vec![base];
        while let Some(last) = levels.last() {
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = downsample(last);
            levels.push(next);
        }
        if let Some(object) = state.textures.get_mut(&texture) {
            object.levels = levels;
        }
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let name = state.allocate()?;
        state.buffers.insert(name, Vec::new());
        state.calls.push(DriverCall::CreateBuffer(name));
        Ok(name)
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DeleteBuffer(buffer));
        if state.buffers.remove(&buffer).is_none() {
            state.fail(GlErrorCode::InvalidValue, "glDeleteBuffers");
            return;
        }
        if state.bindings.array_buffer == Some(buffer) {
            state.bindings.array_buffer = None;
        }
        if state.bindings.element_buffer == Some(buffer) {
            state.bindings.element_buffer = None;
        }
        if let Some(vao) = state.bindings.bound_vertex_array {
            if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
                if vao.element_buffer == Some(buffer) {
                    vao.element_buffer = None;
                }
            }
        }
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<u32>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::BindBuffer(kind, buffer));
        if buffer.is_some_and(|b| !state.buffers.contains_key(&b)) {
            state.fail(GlErrorCode::InvalidOperation, "glBindBuffer");
            return;
        }
        match kind {
            BufferKind::VertexData => state.bindings.array_buffer = buffer,
            BufferKind::IndexData => match state.bindings.bound_vertex_array {
                Some(vao) => {
                    if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
                        vao.element_buffer = buffer;
                    }
                }
                None => state.bindings.element_buffer = buffer,
            },
        }
    }

    fn buffer_data_static(&self, kind: BufferKind, data: &[u8]) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::BufferData { kind, len: data.len() });
        let target = match kind {
            BufferKind::VertexData => state.bindings.array_buffer,
            BufferKind::IndexData => state.element_buffer(),
        };
        match target.and_then(|b| state.buffers.get_mut(&b)) {
            Some(contents) => *contents = data.to_vec(),
            None => state.fail(GlErrorCode::InvalidOperation, "glBufferData"),
        }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let name = state.allocate()?;
        state.vertex_arrays.insert(name, VertexArraySnapshot::default());
        state.calls.push(DriverCall::CreateVertexArray(name));
        Ok(name)
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DeleteVertexArray(vertex_array));
        if state.vertex_arrays.remove(&vertex_array).is_none() {
            state.fail(GlErrorCode::InvalidValue, "glDeleteVertexArrays");
            return;
        }
        if state.bindings.bound_vertex_array == Some(vertex_array) {
            state.bindings.bound_vertex_array = None;
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::BindVertexArray(vertex_array));
        if vertex_array.is_some_and(|v| !state.vertex_arrays.contains_key(&v)) {
            state.fail(GlErrorCode::InvalidOperation, "glBindVertexArray");
            return;
        }
        state.bindings.bound_vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::EnableVertexAttribArray(index));
        if index >= MAX_VERTEX_ATTRIBS {
            state.fail(GlErrorCode::InvalidValue, "glEnableVertexAttribArray");
            return;
        }
        let Some(vao) = state.bindings.bound_vertex_array else {
            state.fail(GlErrorCode::InvalidOperation, "glEnableVertexAttribArray");
            return;
        };
        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            vao.attributes
                .entry(index)
                .or_insert(AttribPointer {
                    enabled: false,
                    components: 4,
                    ty: AttribType::Float,
                    normalized: false,
                    stride: 0,
                    offset: 0,
                    buffer: None,
                })
                .enabled = true;
        }
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
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::VertexAttribPointer { index, components, ty, normalized, stride, offset });
        if index >= MAX_VERTEX_ATTRIBS || !(1..=4).contains(&components) || stride < 0 || offset < 0 {
            state.fail(GlErrorCode::InvalidValue, "glVertexAttribPointer");
            return;
        }
        let (Some(vao), Some(buffer)) = (state.bindings.bound_vertex_array, state.bindings.array_buffer) else {
            state.fail(GlErrorCode::InvalidOperation, "glVertexAttribPointer");
            return;
        };
        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            let enabled = vao.attributes.get(&index).is_some_and(|a| a.enabled);
            vao.attributes.insert(
                index,
                AttribPointer { enabled, components, ty, normalized, stride, offset, buffer: Some(buffer) },
            );
        }
    }

    fn draw_elements(&self, primitive: Primitive, count: i32, index_type: IndexType, offset: i32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::DrawElements { primitive, count, index_type, offset });
        match state.resolve_draw(primitive, count, index_type, offset) {
            Ok(draw) => state.draws.push(draw),
            Err(code) => state.fail(code, "glDrawElements"),
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::ClearColor([r, g, b, a]));
        state.bindings.clear_color = [r, g, b, a];
    }

    fn clear_color_buffer(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::Clear);
        state.frames_cleared += 1;
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::Viewport([x, y, width, height]));
        if width < 0 || height < 0 {
            state.fail(GlErrorCode::InvalidValue, "glViewport");
            return;
        }
        state.bindings.viewport = [x, y, width, height];
    }

    fn set_alpha_blending(&self, enabled: bool) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DriverCall::SetAlphaBlending(enabled));
        state.bindings.alpha_blending = enabled;
    }
}

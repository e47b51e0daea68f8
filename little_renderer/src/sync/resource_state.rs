//! Static resource state table
//!
//! Every GPU-visible resource is always in exactly one `ResourceState`. Each
//! state maps to a constant `StateInfo` record holding the synchronization
//! facts needed to transition into or out of it. Stage and access bit values
//! match the Vulkan 1.0 `VkPipelineStageFlags` / `VkAccessFlags` encodings so
//! backends can convert with a plain bit copy.

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages a barrier waits on or blocks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 0x0000_0001;
        const DRAW_INDIRECT = 0x0000_0002;
        const VERTEX_INPUT = 0x0000_0004;
        const VERTEX_SHADER = 0x0000_0008;
        const TESSELLATION_CONTROL_SHADER = 0x0000_0010;
        const TESSELLATION_EVALUATION_SHADER = 0x0000_0020;
        const GEOMETRY_SHADER = 0x0000_0040;
        const FRAGMENT_SHADER = 0x0000_0080;
        const EARLY_FRAGMENT_TESTS = 0x0000_0100;
        const LATE_FRAGMENT_TESTS = 0x0000_0200;
        const COLOR_ATTACHMENT_OUTPUT = 0x0000_0400;
        const COMPUTE_SHADER = 0x0000_0800;
        const TRANSFER = 0x0000_1000;
        const BOTTOM_OF_PIPE = 0x0000_2000;
        const HOST = 0x0000_4000;
        const ALL_GRAPHICS = 0x0000_8000;
        const ALL_COMMANDS = 0x0001_0000;
        const RAY_TRACING_SHADER = 0x0020_0000;
    }
}

bitflags! {
    /// Memory access rights made available or visible by a barrier
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 0x0000_0001;
        const INDEX_READ = 0x0000_0002;
        const VERTEX_ATTRIBUTE_READ = 0x0000_0004;
        const UNIFORM_READ = 0x0000_0008;
        const INPUT_ATTACHMENT_READ = 0x0000_0010;
        const SHADER_READ = 0x0000_0020;
        const SHADER_WRITE = 0x0000_0040;
        const COLOR_ATTACHMENT_READ = 0x0000_0080;
        const COLOR_ATTACHMENT_WRITE = 0x0000_0100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0000_0200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0000_0400;
        const TRANSFER_READ = 0x0000_0800;
        const TRANSFER_WRITE = 0x0000_1000;
        const HOST_READ = 0x0000_2000;
        const HOST_WRITE = 0x0000_4000;
        const MEMORY_READ = 0x0000_8000;
        const MEMORY_WRITE = 0x0001_0000;
    }
}

bitflags! {
    /// Declared access intent, as used by renderpass and compute code
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryAccess: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
        const INDIRECT = 0x4;
        const GENERAL = 0x8;
    }
}

const PRE_FRAGMENT_SHADERS: PipelineStages = PipelineStages::VERTEX_SHADER
    .union(PipelineStages::TESSELLATION_CONTROL_SHADER)
    .union(PipelineStages::TESSELLATION_EVALUATION_SHADER)
    .union(PipelineStages::GEOMETRY_SHADER);

const ALL_SHADERS: PipelineStages = PRE_FRAGMENT_SHADERS
    .union(PipelineStages::FRAGMENT_SHADER)
    .union(PipelineStages::COMPUTE_SHADER);

const ALL_DEPTH_STENCIL: PipelineStages =
    PipelineStages::EARLY_FRAGMENT_TESTS.union(PipelineStages::LATE_FRAGMENT_TESTS);

/// Native image layout a state implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    Preinitialized,
    PresentSrc,
    SharedPresent,
}

/// Read or write classification of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    ReadOnly,
    Write,
}

/// Barrier priority index
///
/// When a state spans several destination stages, the earliest one is the
/// stage that needs the barrier first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    TopOfPipe,
    DrawIndirect,
    VertexInput,
    VertexShader,
    GeometryShader,
    TransformFeedback,
    EarlyFragmentTest,
    FragmentShader,
    LateFragmentTest,
    ColorAttachmentOutput,
    ComputeShader,
    RayTracingShader,
    Transfer,
    BottomOfPipe,
    Host,
    /// States that are never transitioned into
    InvalidEnum,
}

/// Synchronization facts of one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    pub name: &'static str,
    pub layout: ImageLayout,
    /// Stages at which new accesses occur (destination of a barrier into this state)
    pub stage_in: PipelineStages,
    /// Stages whose writes must complete (source of a barrier out of this state)
    pub stage_out: PipelineStages,
    /// Access bits made visible when entering
    pub access_in: AccessFlags,
    /// Access bits made available when leaving; never contains read bits
    pub access_out: AccessFlags,
    pub access: ResourceAccess,
    pub barrier_index: PipelineStage,
}

/// Logical synchronization state of a GPU resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResourceState {
    Undefined,
    ColorAttachment,
    ColorAttachmentAndFragmentShaderRead,
    ColorAttachmentAndAllShadersRead,
    DepthStencilAttachmentWriteAndFragmentShaderRead,
    DepthStencilAttachmentWriteAndAllShadersRead,
    DepthStencilAttachmentReadAndFragmentShaderRead,
    DepthStencilAttachmentReadAndAllShadersRead,
    DepthStencilAttachmentReadOnly,
    DepthStencilAttachment,
    DepthStencilResolveAttachment,
    Present,
    SharedPresent,
    ExternalPreInitialized,
    ExternalShadersReadOnly,
    ExternalShadersWrite,
    TransferSrc,
    TransferDst,
    VertexShaderReadOnly,
    VertexShaderWrite,
    PreFragmentShadersReadOnly,
    PreFragmentShadersWrite,
    FragmentShaderReadOnly,
    FragmentShaderWrite,
    ComputeShaderReadOnly,
    ComputeShaderWrite,
    AllGraphicsShadersReadOnly,
    AllGraphicsShadersWrite,
    RayTracingShaderReadOnly,
    RayTracingShaderWrite,
    IndirectRead,
}

impl ResourceState {
    /// Number of states in the table
    pub const COUNT: usize = 31;

    /// Every state, in table order
    pub const ALL: [ResourceState; Self::COUNT] = [
        ResourceState::Undefined,
        ResourceState::ColorAttachment,
        ResourceState::ColorAttachmentAndFragmentShaderRead,
        ResourceState::ColorAttachmentAndAllShadersRead,
        ResourceState::DepthStencilAttachmentWriteAndFragmentShaderRead,
        ResourceState::DepthStencilAttachmentWriteAndAllShadersRead,
        ResourceState::DepthStencilAttachmentReadAndFragmentShaderRead,
        ResourceState::DepthStencilAttachmentReadAndAllShadersRead,
        ResourceState::DepthStencilAttachmentReadOnly,
        ResourceState::DepthStencilAttachment,
        ResourceState::DepthStencilResolveAttachment,
        ResourceState::Present,
        ResourceState::SharedPresent,
        ResourceState::ExternalPreInitialized,
        ResourceState::ExternalShadersReadOnly,
        ResourceState::ExternalShadersWrite,
        ResourceState::TransferSrc,
        ResourceState::TransferDst,
        ResourceState::VertexShaderReadOnly,
        ResourceState::VertexShaderWrite,
        ResourceState::PreFragmentShadersReadOnly,
        ResourceState::PreFragmentShadersWrite,
        ResourceState::FragmentShaderReadOnly,
        ResourceState::FragmentShaderWrite,
        ResourceState::ComputeShaderReadOnly,
        ResourceState::ComputeShaderWrite,
        ResourceState::AllGraphicsShadersReadOnly,
        ResourceState::AllGraphicsShadersWrite,
        ResourceState::RayTracingShaderReadOnly,
        ResourceState::RayTracingShaderWrite,
        ResourceState::IndirectRead,
    ];

    /// Table entry for this state
    pub fn info(self) -> &'static StateInfo {
        &STATE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn layout(self) -> ImageLayout {
        self.info().layout
    }

    pub fn is_write(self) -> bool {
        self.info().access == ResourceAccess::Write
    }

    /// State an image attachment should be in for the declared access
    ///
    /// `GENERAL` wins over `WRITE`, which wins over `READ`.
    pub fn for_attachment(access: MemoryAccess, is_depth: bool) -> ResourceState {
        if access.contains(MemoryAccess::GENERAL) {
            ResourceState::ComputeShaderWrite
        } else if access.contains(MemoryAccess::WRITE) {
            if is_depth {
                ResourceState::DepthStencilAttachment
            } else {
                ResourceState::ColorAttachment
            }
        } else if is_depth {
            ResourceState::DepthStencilAttachmentReadOnly
        } else {
            ResourceState::FragmentShaderReadOnly
        }
    }

    /// State a storage buffer should be in for the declared access
    pub fn for_buffer(access: MemoryAccess) -> ResourceState {
        if access.contains(MemoryAccess::WRITE) || access.contains(MemoryAccess::GENERAL) {
            ResourceState::ComputeShaderWrite
        } else if access.contains(MemoryAccess::INDIRECT) {
            ResourceState::IndirectRead
        } else {
            ResourceState::ComputeShaderReadOnly
        }
    }
}

const fn entry(
    name: &'static str,
    layout: ImageLayout,
    stage_in: PipelineStages,
    stage_out: PipelineStages,
    access_in: AccessFlags,
    access_out: AccessFlags,
    access: ResourceAccess,
    barrier_index: PipelineStage,
) -> StateInfo {
    StateInfo { name, layout, stage_in, stage_out, access_in, access_out, access, barrier_index }
}

use AccessFlags as A;
use PipelineStages as S;
use ResourceAccess::{ReadOnly, Write};

// Order must match `ResourceState` discriminants.
#[rustfmt::skip]
static STATE_TABLE: [StateInfo; ResourceState::COUNT] = [
    // Nothing is expected to transition into Undefined; leaving it needs no memory work.
    entry("Undefined", ImageLayout::Undefined,
        S::BOTTOM_OF_PIPE, S::TOP_OF_PIPE,
        A::empty(), A::empty(), ReadOnly, PipelineStage::InvalidEnum),
    entry("ColorAttachment", ImageLayout::ColorAttachmentOptimal,
        S::COLOR_ATTACHMENT_OUTPUT, S::COLOR_ATTACHMENT_OUTPUT,
        A::COLOR_ATTACHMENT_READ.union(A::COLOR_ATTACHMENT_WRITE), A::COLOR_ATTACHMENT_WRITE,
        Write, PipelineStage::ColorAttachmentOutput),
    entry("ColorAttachmentAndFragmentShaderRead", ImageLayout::General,
        S::COLOR_ATTACHMENT_OUTPUT.union(S::FRAGMENT_SHADER),
        S::COLOR_ATTACHMENT_OUTPUT.union(S::FRAGMENT_SHADER),
        A::COLOR_ATTACHMENT_READ.union(A::COLOR_ATTACHMENT_WRITE).union(A::SHADER_READ),
        A::COLOR_ATTACHMENT_WRITE, Write, PipelineStage::FragmentShader),
    entry("ColorAttachmentAndAllShadersRead", ImageLayout::General,
        S::COLOR_ATTACHMENT_OUTPUT.union(ALL_SHADERS),
        S::COLOR_ATTACHMENT_OUTPUT.union(ALL_SHADERS),
        A::COLOR_ATTACHMENT_READ.union(A::COLOR_ATTACHMENT_WRITE).union(A::SHADER_READ),
        A::COLOR_ATTACHMENT_WRITE, Write, PipelineStage::VertexShader),
    entry("DepthStencilAttachmentWriteAndFragmentShaderRead", ImageLayout::General,
        ALL_DEPTH_STENCIL.union(S::FRAGMENT_SHADER),
        ALL_DEPTH_STENCIL.union(S::FRAGMENT_SHADER),
        A::DEPTH_STENCIL_ATTACHMENT_READ.union(A::DEPTH_STENCIL_ATTACHMENT_WRITE).union(A::SHADER_READ),
        A::DEPTH_STENCIL_ATTACHMENT_WRITE, Write, PipelineStage::FragmentShader),
    entry("DepthStencilAttachmentWriteAndAllShadersRead", ImageLayout::General,
        ALL_DEPTH_STENCIL.union(ALL_SHADERS),
        ALL_DEPTH_STENCIL.union(ALL_SHADERS),
        A::DEPTH_STENCIL_ATTACHMENT_READ.union(A::DEPTH_STENCIL_ATTACHMENT_WRITE).union(A::SHADER_READ),
        A::DEPTH_STENCIL_ATTACHMENT_WRITE, Write, PipelineStage::VertexShader),
    entry("DepthStencilAttachmentReadAndFragmentShaderRead", ImageLayout::DepthStencilReadOnlyOptimal,
        S::FRAGMENT_SHADER.union(ALL_DEPTH_STENCIL),
        S::FRAGMENT_SHADER.union(ALL_DEPTH_STENCIL),
        A::SHADER_READ.union(A::DEPTH_STENCIL_ATTACHMENT_READ), A::empty(),
        ReadOnly, PipelineStage::EarlyFragmentTest),
    entry("DepthStencilAttachmentReadAndAllShadersRead", ImageLayout::DepthStencilReadOnlyOptimal,
        ALL_SHADERS.union(ALL_DEPTH_STENCIL),
        ALL_SHADERS.union(ALL_DEPTH_STENCIL),
        A::SHADER_READ.union(A::DEPTH_STENCIL_ATTACHMENT_READ), A::empty(),
        ReadOnly, PipelineStage::VertexShader),
    entry("DepthStencilAttachmentReadOnly", ImageLayout::DepthStencilReadOnlyOptimal,
        ALL_DEPTH_STENCIL, ALL_DEPTH_STENCIL,
        A::DEPTH_STENCIL_ATTACHMENT_READ, A::empty(),
        ReadOnly, PipelineStage::EarlyFragmentTest),
    entry("DepthStencilAttachment", ImageLayout::DepthStencilAttachmentOptimal,
        ALL_DEPTH_STENCIL, ALL_DEPTH_STENCIL,
        A::DEPTH_STENCIL_ATTACHMENT_READ.union(A::DEPTH_STENCIL_ATTACHMENT_WRITE),
        A::DEPTH_STENCIL_ATTACHMENT_WRITE, Write, PipelineStage::EarlyFragmentTest),
    // Depth/stencil resolve runs in the color output stage.
    entry("DepthStencilResolveAttachment", ImageLayout::DepthStencilAttachmentOptimal,
        S::COLOR_ATTACHMENT_OUTPUT, S::COLOR_ATTACHMENT_OUTPUT,
        A::COLOR_ATTACHMENT_WRITE, A::COLOR_ATTACHMENT_WRITE,
        Write, PipelineStage::ColorAttachmentOutput),
    // Queue present performs its own visibility operation.
    entry("Present", ImageLayout::PresentSrc,
        S::BOTTOM_OF_PIPE, S::TOP_OF_PIPE,
        A::empty(), A::empty(), ReadOnly, PipelineStage::BottomOfPipe),
    entry("SharedPresent", ImageLayout::SharedPresent,
        S::BOTTOM_OF_PIPE, S::TOP_OF_PIPE,
        A::MEMORY_READ.union(A::MEMORY_WRITE), A::MEMORY_WRITE,
        Write, PipelineStage::BottomOfPipe),
    entry("ExternalPreInitialized", ImageLayout::Preinitialized,
        S::BOTTOM_OF_PIPE, S::HOST.union(S::ALL_COMMANDS),
        A::empty(), A::MEMORY_WRITE, ReadOnly, PipelineStage::InvalidEnum),
    entry("ExternalShadersReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        S::ALL_COMMANDS, S::ALL_COMMANDS,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::TopOfPipe),
    entry("ExternalShadersWrite", ImageLayout::General,
        S::ALL_COMMANDS, S::ALL_COMMANDS,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::TopOfPipe),
    entry("TransferSrc", ImageLayout::TransferSrcOptimal,
        S::TRANSFER, S::TRANSFER,
        A::TRANSFER_READ, A::empty(), ReadOnly, PipelineStage::Transfer),
    entry("TransferDst", ImageLayout::TransferDstOptimal,
        S::TRANSFER, S::TRANSFER,
        A::TRANSFER_WRITE, A::TRANSFER_WRITE, Write, PipelineStage::Transfer),
    entry("VertexShaderReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        S::VERTEX_SHADER, S::VERTEX_SHADER,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::VertexShader),
    entry("VertexShaderWrite", ImageLayout::General,
        S::VERTEX_SHADER, S::VERTEX_SHADER,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::VertexShader),
    entry("PreFragmentShadersReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        PRE_FRAGMENT_SHADERS, PRE_FRAGMENT_SHADERS,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::VertexShader),
    entry("PreFragmentShadersWrite", ImageLayout::General,
        PRE_FRAGMENT_SHADERS, PRE_FRAGMENT_SHADERS,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::VertexShader),
    entry("FragmentShaderReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        S::FRAGMENT_SHADER, S::FRAGMENT_SHADER,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::FragmentShader),
    entry("FragmentShaderWrite", ImageLayout::General,
        S::FRAGMENT_SHADER, S::FRAGMENT_SHADER,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::FragmentShader),
    entry("ComputeShaderReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        S::COMPUTE_SHADER, S::COMPUTE_SHADER,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::ComputeShader),
    entry("ComputeShaderWrite", ImageLayout::General,
        S::COMPUTE_SHADER, S::COMPUTE_SHADER,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::ComputeShader),
    entry("AllGraphicsShadersReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        ALL_SHADERS, ALL_SHADERS,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::VertexShader),
    entry("AllGraphicsShadersWrite", ImageLayout::General,
        ALL_SHADERS, ALL_SHADERS,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::VertexShader),
    entry("RayTracingShaderReadOnly", ImageLayout::ShaderReadOnlyOptimal,
        S::RAY_TRACING_SHADER, S::RAY_TRACING_SHADER,
        A::SHADER_READ, A::empty(), ReadOnly, PipelineStage::RayTracingShader),
    entry("RayTracingShaderWrite", ImageLayout::General,
        S::RAY_TRACING_SHADER, S::RAY_TRACING_SHADER,
        A::SHADER_READ.union(A::SHADER_WRITE), A::SHADER_WRITE,
        Write, PipelineStage::RayTracingShader),
    // Indirect arguments are consumed by draw/dispatch; compute produced them.
    entry("IndirectRead", ImageLayout::General,
        S::DRAW_INDIRECT.union(S::COMPUTE_SHADER), S::DRAW_INDIRECT.union(S::COMPUTE_SHADER),
        A::INDIRECT_COMMAND_READ, A::empty(), ReadOnly, PipelineStage::DrawIndirect),
];

#[cfg(test)]
#[path = "resource_state_tests.rs"]
mod tests;

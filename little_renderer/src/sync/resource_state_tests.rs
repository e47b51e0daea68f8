//! Unit tests for resource_state.rs

use super::*;

// ============================================================================
// TABLE CONSISTENCY
// ============================================================================

#[test]
fn test_table_order_matches_discriminants() {
    for (index, state) in ResourceState::ALL.iter().enumerate() {
        assert_eq!(*state as usize, index);
        assert_eq!(state.name(), format!("{:?}", state));
    }
}

#[test]
fn test_read_only_states_have_no_leaving_access() {
    for state in ResourceState::ALL {
        let info = state.info();
        if info.access == ResourceAccess::ReadOnly && state != ResourceState::ExternalPreInitialized {
            assert!(info.access_out.is_empty(), "{} should not make writes available", info.name);
        }
    }
}

#[test]
fn test_leaving_access_never_contains_reads() {
    let reads = AccessFlags::INDIRECT_COMMAND_READ
        | AccessFlags::INDEX_READ
        | AccessFlags::VERTEX_ATTRIBUTE_READ
        | AccessFlags::UNIFORM_READ
        | AccessFlags::INPUT_ATTACHMENT_READ
        | AccessFlags::SHADER_READ
        | AccessFlags::COLOR_ATTACHMENT_READ
        | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
        | AccessFlags::TRANSFER_READ
        | AccessFlags::HOST_READ
        | AccessFlags::MEMORY_READ;
    for state in ResourceState::ALL {
        assert!(!state.info().access_out.intersects(reads), "{}", state.name());
    }
}

#[test]
fn test_write_states_have_leaving_access() {
    for state in ResourceState::ALL {
        if state.is_write() {
            assert!(!state.info().access_out.is_empty(), "{}", state.name());
        }
    }
}

#[test]
fn test_every_state_has_stages() {
    for state in ResourceState::ALL {
        let info = state.info();
        assert!(!info.stage_in.is_empty(), "{}", info.name);
        assert!(!info.stage_out.is_empty(), "{}", info.name);
    }
}

// ============================================================================
// SPECIFIC ENTRIES
// ============================================================================

#[test]
fn test_undefined_entry() {
    let info = ResourceState::Undefined.info();
    assert_eq!(info.layout, ImageLayout::Undefined);
    assert_eq!(info.stage_out, PipelineStages::TOP_OF_PIPE);
    assert!(info.access_out.is_empty());
    assert_eq!(info.access, ResourceAccess::ReadOnly);
    assert_eq!(info.barrier_index, PipelineStage::InvalidEnum);
}

#[test]
fn test_color_attachment_entry() {
    let info = ResourceState::ColorAttachment.info();
    assert_eq!(info.layout, ImageLayout::ColorAttachmentOptimal);
    assert_eq!(info.stage_in, PipelineStages::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(
        info.access_in,
        AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE
    );
    assert_eq!(info.access_out, AccessFlags::COLOR_ATTACHMENT_WRITE);
    assert!(ResourceState::ColorAttachment.is_write());
}

#[test]
fn test_depth_stencil_attachment_covers_both_test_stages() {
    let info = ResourceState::DepthStencilAttachment.info();
    assert!(info.stage_in.contains(PipelineStages::EARLY_FRAGMENT_TESTS));
    assert!(info.stage_in.contains(PipelineStages::LATE_FRAGMENT_TESTS));
    assert_eq!(info.layout, ImageLayout::DepthStencilAttachmentOptimal);
}

#[test]
fn test_present_entry() {
    let info = ResourceState::Present.info();
    assert_eq!(info.layout, ImageLayout::PresentSrc);
    assert_eq!(info.stage_in, PipelineStages::BOTTOM_OF_PIPE);
    assert!(info.access_in.is_empty());
    assert!(!ResourceState::Present.is_write());
}

#[test]
fn test_all_shaders_read_includes_compute_and_geometry() {
    let info = ResourceState::AllGraphicsShadersReadOnly.info();
    assert!(info.stage_in.contains(PipelineStages::COMPUTE_SHADER));
    assert!(info.stage_in.contains(PipelineStages::GEOMETRY_SHADER));
    assert!(info.stage_in.contains(PipelineStages::FRAGMENT_SHADER));
    assert_eq!(info.layout, ImageLayout::ShaderReadOnlyOptimal);
}

#[test]
fn test_transfer_entries() {
    assert_eq!(ResourceState::TransferSrc.layout(), ImageLayout::TransferSrcOptimal);
    assert_eq!(ResourceState::TransferDst.layout(), ImageLayout::TransferDstOptimal);
    assert!(!ResourceState::TransferSrc.is_write());
    assert!(ResourceState::TransferDst.is_write());
}

#[test]
fn test_barrier_index_ordering() {
    assert!(PipelineStage::TopOfPipe < PipelineStage::VertexShader);
    assert!(PipelineStage::VertexShader < PipelineStage::FragmentShader);
    assert!(PipelineStage::FragmentShader < PipelineStage::ColorAttachmentOutput);
    assert!(PipelineStage::Host < PipelineStage::InvalidEnum);
}

#[test]
fn test_stage_bits_match_native_encoding() {
    assert_eq!(PipelineStages::COLOR_ATTACHMENT_OUTPUT.bits(), 0x400);
    assert_eq!(PipelineStages::COMPUTE_SHADER.bits(), 0x800);
    assert_eq!(AccessFlags::SHADER_WRITE.bits(), 0x40);
    assert_eq!(AccessFlags::MEMORY_WRITE.bits(), 0x10000);
}

// ============================================================================
// ACCESS MAPPING
// ============================================================================

#[test]
fn test_for_attachment_color() {
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::READ, false),
        ResourceState::FragmentShaderReadOnly
    );
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::WRITE, false),
        ResourceState::ColorAttachment
    );
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::READ | MemoryAccess::WRITE, false),
        ResourceState::ColorAttachment
    );
}

#[test]
fn test_for_attachment_depth() {
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::READ, true),
        ResourceState::DepthStencilAttachmentReadOnly
    );
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::WRITE, true),
        ResourceState::DepthStencilAttachment
    );
}

#[test]
fn test_for_attachment_general_wins() {
    assert_eq!(
        ResourceState::for_attachment(MemoryAccess::GENERAL | MemoryAccess::WRITE, false),
        ResourceState::ComputeShaderWrite
    );
}

#[test]
fn test_for_buffer() {
    assert_eq!(ResourceState::for_buffer(MemoryAccess::READ), ResourceState::ComputeShaderReadOnly);
    assert_eq!(ResourceState::for_buffer(MemoryAccess::WRITE), ResourceState::ComputeShaderWrite);
    assert_eq!(
        ResourceState::for_buffer(MemoryAccess::READ | MemoryAccess::INDIRECT),
        ResourceState::IndirectRead
    );
    assert_eq!(
        ResourceState::IndirectRead.info().access_in,
        AccessFlags::INDIRECT_COMMAND_READ
    );
}

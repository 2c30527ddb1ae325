//! Stencil states for the multi-pass techniques
//!
//! Every effect here is built from two stencil configurations: a pass that
//! writes a reference value wherever it rasterizes, and a pass that tests
//! against that value without writing. Both are plain data, so the per-pass
//! stencil setup can be asserted without a device.

use ash::vk;

/// Stencil state for a write pass: the test always passes and every covered
/// fragment replaces the stencil value with `reference`.
pub fn stencil_write_state(reference: u32) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: vk::StencilOp::KEEP,
        pass_op: vk::StencilOp::REPLACE,
        depth_fail_op: vk::StencilOp::KEEP,
        compare_op: vk::CompareOp::ALWAYS,
        compare_mask: 0xFF,
        write_mask: 0xFF,
        reference,
    }
}

/// Stencil state for a mask pass: fragments only survive where the stencil
/// value compares against `reference` under `compare_op`, and the buffer is
/// never modified.
pub fn stencil_mask_state(reference: u32, compare_op: vk::CompareOp) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: vk::StencilOp::KEEP,
        pass_op: vk::StencilOp::KEEP,
        depth_fail_op: vk::StencilOp::KEEP,
        compare_op,
        compare_mask: 0xFF,
        write_mask: 0,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_state_replaces_unconditionally() {
        let state = stencil_write_state(1);
        assert_eq!(state.compare_op, vk::CompareOp::ALWAYS);
        assert_eq!(state.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(state.fail_op, vk::StencilOp::KEEP);
        assert_eq!(state.write_mask, 0xFF);
        assert_eq!(state.reference, 1);
    }

    #[test]
    fn mask_state_never_writes() {
        let state = stencil_mask_state(1, vk::CompareOp::EQUAL);
        assert_eq!(state.write_mask, 0);
        assert_eq!(state.pass_op, vk::StencilOp::KEEP);
        assert_eq!(state.depth_fail_op, vk::StencilOp::KEEP);
        assert_eq!(state.compare_op, vk::CompareOp::EQUAL);
    }

    #[test]
    fn mask_state_carries_the_chosen_comparison() {
        let state = stencil_mask_state(1, vk::CompareOp::NOT_EQUAL);
        assert_eq!(state.compare_op, vk::CompareOp::NOT_EQUAL);
        assert_eq!(state.reference, 1);
    }
}

//! Graphics pipeline construction
//!
//! `PipelineConfig` is plain data describing the fixed-function state, so the
//! stencil and blend setup of each technique pass can be inspected without a
//! device. `PipelineBuilder` owns its shader modules and destroys them once
//! the pipeline exists; `build` consumes the builder.

use ash::{vk, Device};

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::mesh::Vertex;
use crate::render::shader::ShaderModule;

/// Fixed-function state for one graphics pipeline.
///
/// Defaults: triangle list, filled, back-face culled with CCW front faces,
/// depth test and write on with LESS, stencil and blending off.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Primitive topology
    pub topology: vk::PrimitiveTopology,
    /// Polygon fill mode
    pub polygon_mode: vk::PolygonMode,
    /// Face culling mode
    pub cull_mode: vk::CullModeFlags,
    /// Winding order of front faces
    pub front_face: vk::FrontFace,
    /// Rasterized line width
    pub line_width: f32,
    /// Depth test enable
    pub depth_test_enable: bool,
    /// Depth write enable
    pub depth_write_enable: bool,
    /// Depth comparison
    pub depth_compare_op: vk::CompareOp,
    /// Stencil test enable
    pub stencil_test_enable: bool,
    /// Front-facing stencil state
    pub front_stencil: vk::StencilOpState,
    /// Back-facing stencil state
    pub back_stencil: vk::StencilOpState,
    /// Alpha blending enable
    pub blend_enable: bool,
    /// Which color channels the pass writes
    pub color_write_mask: vk::ColorComponentFlags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            line_width: 1.0,
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            stencil_test_enable: false,
            front_stencil: vk::StencilOpState::default(),
            back_stencil: vk::StencilOpState::default(),
            blend_enable: false,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

/// Builds a graphics pipeline from shader modules, a vertex layout, and a
/// [`PipelineConfig`].
pub struct PipelineBuilder {
    vertex_shader: Option<ShaderModule>,
    fragment_shader: Option<ShaderModule>,
    geometry_shader: Option<ShaderModule>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a builder with default fixed-function state
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            geometry_shader: None,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    /// Set the vertex shader
    pub fn vertex_shader(mut self, shader: ShaderModule) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    /// Set the fragment shader
    pub fn fragment_shader(mut self, shader: ShaderModule) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    /// Set an optional geometry shader
    pub fn geometry_shader(mut self, shader: ShaderModule) -> Self {
        self.geometry_shader = Some(shader);
        self
    }

    /// Use the standard [`Vertex`] layout on `binding`
    pub fn add_standard_vertex_input(mut self, binding: u32) -> Self {
        self.vertex_bindings.push(Vertex::binding_description(binding));
        self.vertex_attributes
            .extend(Vertex::attribute_descriptions(binding));
        self
    }

    /// Set primitive topology
    pub fn set_primitive_topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.config.topology = topology;
        self
    }

    /// Set polygon fill mode
    pub fn set_polygon_mode(mut self, mode: vk::PolygonMode) -> Self {
        self.config.polygon_mode = mode;
        self
    }

    /// Set face culling mode
    pub fn set_cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.config.cull_mode = cull_mode;
        self
    }

    /// Set front-face winding
    pub fn set_front_face(mut self, front_face: vk::FrontFace) -> Self {
        self.config.front_face = front_face;
        self
    }

    /// Set rasterized line width
    pub fn set_line_width(mut self, width: f32) -> Self {
        self.config.line_width = width;
        self
    }

    /// Enable or disable the depth test
    pub fn set_depth_test_enabled(mut self, enabled: bool) -> Self {
        self.config.depth_test_enable = enabled;
        self
    }

    /// Enable or disable depth writes
    pub fn set_depth_write_enabled(mut self, enabled: bool) -> Self {
        self.config.depth_write_enable = enabled;
        self
    }

    /// Set the depth comparison
    pub fn set_depth_compare_op(mut self, op: vk::CompareOp) -> Self {
        self.config.depth_compare_op = op;
        self
    }

    /// Enable or disable the stencil test
    pub fn set_stencil_test_enabled(mut self, enabled: bool) -> Self {
        self.config.stencil_test_enable = enabled;
        self
    }

    /// Set the whole front-facing stencil state
    pub fn set_front_stencil(mut self, state: vk::StencilOpState) -> Self {
        self.config.front_stencil = state;
        self
    }

    /// Set the stencil op when the stencil test fails on front faces
    pub fn set_front_stencil_fail_op(mut self, op: vk::StencilOp) -> Self {
        self.config.front_stencil.fail_op = op;
        self
    }

    /// Set the stencil op when both tests pass on front faces
    pub fn set_front_stencil_pass_op(mut self, op: vk::StencilOp) -> Self {
        self.config.front_stencil.pass_op = op;
        self
    }

    /// Set the stencil op when the depth test fails on front faces
    pub fn set_front_stencil_depth_fail_op(mut self, op: vk::StencilOp) -> Self {
        self.config.front_stencil.depth_fail_op = op;
        self
    }

    /// Set the front-facing stencil comparison
    pub fn set_front_stencil_compare_op(mut self, op: vk::CompareOp) -> Self {
        self.config.front_stencil.compare_op = op;
        self
    }

    /// Set the front-facing stencil compare mask
    pub fn set_front_stencil_compare_mask(mut self, mask: u32) -> Self {
        self.config.front_stencil.compare_mask = mask;
        self
    }

    /// Set the front-facing stencil write mask
    pub fn set_front_stencil_write_mask(mut self, mask: u32) -> Self {
        self.config.front_stencil.write_mask = mask;
        self
    }

    /// Set the front-facing stencil reference value
    pub fn set_front_stencil_reference(mut self, reference: u32) -> Self {
        self.config.front_stencil.reference = reference;
        self
    }

    /// Mirror the front stencil state onto back faces
    pub fn copy_front_stencil_to_back(mut self) -> Self {
        self.config.back_stencil = self.config.front_stencil;
        self
    }

    /// Enable or disable standard alpha blending
    pub fn set_blending_enabled(mut self, enabled: bool) -> Self {
        self.config.blend_enable = enabled;
        self
    }

    /// Restrict which color channels the pass writes
    pub fn set_color_write_mask(mut self, mask: vk::ColorComponentFlags) -> Self {
        self.config.color_write_mask = mask;
        self
    }

    /// The fixed-function state accumulated so far
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create the pipeline layout and graphics pipeline.
    ///
    /// Viewport and scissor are dynamic state; every pass sets them while
    /// recording. The owned shader modules are destroyed on return.
    pub fn build(
        self,
        ctx: &VulkanContext,
        set_layout: vk::DescriptorSetLayout,
    ) -> VulkanResult<Pipeline> {
        let vertex_shader = self.vertex_shader.ok_or_else(|| VulkanError::Config {
            reason: "pipeline requires a vertex shader".to_string(),
        })?;
        let fragment_shader = self.fragment_shader.ok_or_else(|| VulkanError::Config {
            reason: "pipeline requires a fragment shader".to_string(),
        })?;

        let mut shader_stages = vec![
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];
        if let Some(ref geometry_shader) = self.geometry_shader {
            shader_stages.push(geometry_shader.stage_info(vk::ShaderStageFlags::GEOMETRY));
        }

        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.config.topology)
            .primitive_restart_enable(false);

        // Dynamic viewport and scissor, counts only
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.config.polygon_mode)
            .line_width(self.config.line_width)
            .cull_mode(self.config.cull_mode)
            .front_face(self.config.front_face)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(self.config.depth_test_enable)
            .depth_write_enable(self.config.depth_write_enable)
            .depth_compare_op(self.config.depth_compare_op)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(self.config.stencil_test_enable)
            .front(self.config.front_stencil)
            .back(self.config.back_stencil);

        let color_blend_attachment = if self.config.blend_enable {
            vk::PipelineColorBlendAttachmentState::builder()
                .color_write_mask(self.config.color_write_mask)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .build()
        } else {
            vk::PipelineColorBlendAttachmentState::builder()
                .color_write_mask(self.config.color_write_mask)
                .blend_enable(false)
                .build()
        };

        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let set_layouts = [set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe {
            ctx.device
                .create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(ctx.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, err)| {
                    ctx.device.destroy_pipeline_layout(layout, None);
                    VulkanError::Api(err)
                })?
        };

        log::debug!(
            "[PIPELINE] Created pipeline (stencil: {}, blend: {})",
            self.config.stencil_test_enable,
            self.config.blend_enable
        );

        Ok(Pipeline {
            device: ctx.device.clone(),
            pipeline: pipelines[0],
            layout,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct Pipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl Pipeline {
    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_opaque_pass() {
        crate::foundation::logging::init_for_tests();
        let config = PipelineConfig::default();
        assert_eq!(config.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(config.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(config.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        assert!(config.depth_test_enable);
        assert!(config.depth_write_enable);
        assert_eq!(config.depth_compare_op, vk::CompareOp::LESS);
        assert!(!config.stencil_test_enable);
        assert!(!config.blend_enable);
    }

    #[test]
    fn stencil_setters_shape_the_write_pass() {
        let builder = PipelineBuilder::new()
            .set_stencil_test_enabled(true)
            .set_front_stencil_fail_op(vk::StencilOp::KEEP)
            .set_front_stencil_pass_op(vk::StencilOp::REPLACE)
            .set_front_stencil_depth_fail_op(vk::StencilOp::KEEP)
            .set_front_stencil_compare_op(vk::CompareOp::ALWAYS)
            .set_front_stencil_compare_mask(0xFF)
            .set_front_stencil_write_mask(0xFF)
            .set_front_stencil_reference(1)
            .copy_front_stencil_to_back();

        let config = builder.config();
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::ALWAYS);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.back_stencil.pass_op, config.front_stencil.pass_op);
        assert_eq!(config.back_stencil.reference, config.front_stencil.reference);
    }

    #[test]
    fn copy_front_to_back_snapshots_current_state() {
        let builder = PipelineBuilder::new()
            .set_front_stencil_reference(1)
            .copy_front_stencil_to_back()
            .set_front_stencil_reference(2);

        assert_eq!(builder.config().back_stencil.reference, 1);
        assert_eq!(builder.config().front_stencil.reference, 2);
    }
}

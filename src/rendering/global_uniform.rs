use crate::{
    camera::CameraUniform, lights::LightsUniform,
    rendering::util::bind_group_builder::BindGroupBuilder,
};

/// Bind group 0 of the scene shaders: camera and lights.
pub struct GlobalUniform {
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera_buffer = CameraUniform::default().create_buffer(device);
        let lights_buffer = LightsUniform::default().create_buffer(device);

        let (bind_group_layout, bind_group) =
            BindGroupBuilder::new("Global uniform", wgpu::ShaderStages::VERTEX_FRAGMENT)
                .uniform(0, &camera_buffer)
                .uniform(1, &lights_buffer)
                .build(device);

        Self {
            camera_buffer,
            lights_buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &CameraUniform, lights: &LightsUniform) {
        camera.update_buffer(queue, &self.camera_buffer);
        lights.update_buffer(queue, &self.lights_buffer);
    }
}

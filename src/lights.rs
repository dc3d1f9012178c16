use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::color::Color;

#[derive(Debug, Clone)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 0.5,
        }
    }
}

/// Infinitely distant light shining from `position` towards `target`.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or(Vec3::Y)
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.5,
            position: Vec3::new(3.0, 2.0, -8.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

/// This should match the `Lights` struct in the WGSL shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, Default)]
pub struct LightsUniform {
    // rgb is colour * intensity, w unused
    ambient: [f32; 4],
    directional_color: [f32; 4],
    directional_direction: [f32; 4],
}

impl LightsUniform {
    pub fn new(lights: &Lights) -> Self {
        let ambient = lights.ambient.color.linear() * lights.ambient.intensity;
        let directional = lights.directional.color.linear() * lights.directional.intensity;

        Self {
            ambient: ambient.extend(0.0).to_array(),
            directional_color: directional.extend(0.0).to_array(),
            directional_direction: lights.directional.direction().extend(0.0).to_array(),
        }
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

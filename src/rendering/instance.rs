use std::{collections::HashMap, mem::size_of};

use glam::{Mat4, Vec3};
use itertools::Itertools;
use wgpu::BufferUsages;

use crate::{
    material::MaterialManager, rendering::render_model::RenderMesh, scene_graph::object3d::Mesh,
};

/// This should match `InstanceInput` in standard.wgsl
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model_matrix: Mat4,
}

impl InstanceData {
    pub fn new(model_matrix: Mat4) -> Self {
        Self { model_matrix }
    }

    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
        ];

        wgpu::VertexBufferLayout {
            array_stride: size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// A run of instances in the frame's instance buffer sharing geometry and material
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBatch {
    pub mesh: Mesh,
    pub start_index: u32,
    pub instance_count: u32,
    pub transparent: bool,
}

/// Instances for one frame, laid out batch by batch.
#[derive(Debug, Default)]
pub struct FrameInstances {
    pub instances: Vec<InstanceData>,
    /// Opaque batches first, then transparent ones from far to near
    pub batches: Vec<InstanceBatch>,
}

impl FrameInstances {
    /// Groups opaque meshes by geometry and material. Transparent meshes get a batch
    /// each so they can be sorted by distance from the camera.
    pub fn gather(
        meshes: &[(Mat4, Mesh)],
        materials: &MaterialManager,
        camera_position: Vec3,
    ) -> Self {
        let is_transparent = |mesh: &Mesh| {
            materials
                .material(mesh.material)
                .is_some_and(|material| material.transparent)
        };

        let (transparent, opaque): (Vec<&(Mat4, Mesh)>, Vec<&(Mat4, Mesh)>) =
            meshes.iter().partition(|(_, mesh)| is_transparent(mesh));

        let mut groups: Vec<(Mesh, Vec<InstanceData>)> = Vec::new();
        let mut group_indices: HashMap<Mesh, usize> = HashMap::new();

        for (world_matrix, mesh) in opaque {
            let index = *group_indices.entry(*mesh).or_insert_with(|| {
                groups.push((*mesh, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(InstanceData::new(*world_matrix));
        }

        let mut frame = FrameInstances::default();

        for (mesh, instances) in groups {
            frame.push_batch(mesh, &instances, false);
        }

        let back_to_front = transparent.into_iter().sorted_by(|(a, _), (b, _)| {
            let distance_a = a.w_axis.truncate().distance_squared(camera_position);
            let distance_b = b.w_axis.truncate().distance_squared(camera_position);
            distance_b.total_cmp(&distance_a)
        });

        for (world_matrix, mesh) in back_to_front {
            frame.push_batch(*mesh, &[InstanceData::new(*world_matrix)], true);
        }

        frame
    }

    fn push_batch(&mut self, mesh: Mesh, instances: &[InstanceData], transparent: bool) {
        self.batches.push(InstanceBatch {
            mesh,
            start_index: self.instances.len() as u32,
            instance_count: instances.len() as u32,
            transparent,
        });
        self.instances.extend_from_slice(instances);
    }
}

/// Per-instance vertex buffer bound to slot 1. Grows when a frame needs more room.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: u64 = 128;

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::create_buffer(device, Self::INITIAL_CAPACITY),
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    fn create_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance buffer"),
            size: size_of::<InstanceData>() as u64 * capacity,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, required_capacity: u64) {
        if required_capacity > self.capacity {
            let new_capacity = (required_capacity * 2).max(Self::INITIAL_CAPACITY);
            log::debug!("Growing instance buffer to {} instances", new_capacity);
            self.buffer = Self::create_buffer(device, new_capacity);
            self.capacity = new_capacity;
        }
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[InstanceData]) {
        if instances.is_empty() {
            return;
        }

        self.ensure_capacity(device, instances.len() as u64);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer.slice(..));
    }
}

pub fn render_batch(
    render_pass: &mut wgpu::RenderPass<'_>,
    render_mesh: &RenderMesh,
    batch: &InstanceBatch,
) {
    render_pass.set_vertex_buffer(0, render_mesh.vertex_buffer.slice(..));
    render_pass.set_index_buffer(render_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

    render_pass.draw_indexed(
        0..render_mesh.num_indices,
        0,
        batch.start_index..(batch.start_index + batch.instance_count),
    );
}

#[cfg(test)]
mod tests {
    use id_arena::Arena;

    use super::*;
    use crate::{
        geometry::{cuboid, Geometry},
        material::StandardMaterial,
    };

    struct Fixture {
        materials: MaterialManager,
        grave: Mesh,
        bush: Mesh,
        floor: Mesh,
    }

    fn fixture() -> Fixture {
        let mut geometries = Arena::<Geometry>::new();
        let box_geometry = geometries.alloc(cuboid(1.0, 1.0, 1.0));
        let other_geometry = geometries.alloc(cuboid(2.0, 2.0, 2.0));

        let mut materials = MaterialManager::new();
        let stone = materials.add_material(StandardMaterial::default());
        let leaves = materials.add_material(StandardMaterial::default());
        let ground = materials.add_material(StandardMaterial {
            transparent: true,
            ..Default::default()
        });

        Fixture {
            materials,
            grave: Mesh {
                geometry: box_geometry,
                material: stone,
            },
            bush: Mesh {
                geometry: other_geometry,
                material: leaves,
            },
            floor: Mesh {
                geometry: box_geometry,
                material: ground,
            },
        }
    }

    fn at(x: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, z))
    }

    #[test]
    fn shared_mesh_becomes_one_batch() {
        let fixture = fixture();
        let meshes = vec![
            (at(1.0, 0.0), fixture.grave),
            (at(0.0, 0.0), fixture.bush),
            (at(2.0, 0.0), fixture.grave),
            (at(3.0, 0.0), fixture.grave),
        ];

        let frame = FrameInstances::gather(&meshes, &fixture.materials, Vec3::ZERO);

        assert_eq!(frame.instances.len(), 4);
        assert_eq!(frame.batches.len(), 2);
        assert_eq!(frame.batches[0].mesh, fixture.grave);
        assert_eq!(frame.batches[0].start_index, 0);
        assert_eq!(frame.batches[0].instance_count, 3);
        assert_eq!(frame.batches[1].start_index, 3);
        assert!(frame.batches.iter().all(|batch| !batch.transparent));

        // Instance order within a batch follows scene order
        assert_eq!(frame.instances[1].model_matrix, at(2.0, 0.0));
    }

    #[test]
    fn transparent_batches_come_last_far_to_near() {
        let fixture = fixture();
        let meshes = vec![
            (at(1.0, 0.0), fixture.floor),
            (at(0.0, 0.0), fixture.grave),
            (at(9.0, 0.0), fixture.floor),
            (at(4.0, 0.0), fixture.floor),
        ];

        let frame = FrameInstances::gather(&meshes, &fixture.materials, Vec3::ZERO);

        assert_eq!(frame.batches.len(), 4);
        assert!(!frame.batches[0].transparent);

        let transparent_x: Vec<f32> = frame.batches[1..]
            .iter()
            .map(|batch| {
                assert!(batch.transparent);
                assert_eq!(batch.instance_count, 1);
                frame.instances[batch.start_index as usize]
                    .model_matrix
                    .w_axis
                    .x
            })
            .collect();
        assert_eq!(transparent_x, vec![9.0, 4.0, 1.0]);
    }

    #[test]
    fn empty_scene_has_no_batches() {
        let fixture = fixture();
        let frame = FrameInstances::gather(&[], &fixture.materials, Vec3::ZERO);
        assert!(frame.batches.is_empty());
        assert!(frame.instances.is_empty());
    }
}

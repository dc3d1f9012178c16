/// Builds a bind group and its layout from the same list of bindings, so the two can't
/// drift apart.
pub struct BindGroupBuilder<'a> {
    label: &'a str,
    visibility: wgpu::ShaderStages,
    layout_entries: Vec<wgpu::BindGroupLayoutEntry>,
    entries: Vec<wgpu::BindGroupEntry<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn new(label: &'a str, visibility: wgpu::ShaderStages) -> Self {
        Self {
            label,
            visibility,
            layout_entries: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn uniform(self, binding: u32, buffer: &'a wgpu::Buffer) -> Self {
        self.entry(
            binding,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            buffer.as_entire_binding(),
        )
    }

    pub fn texture(self, binding: u32, view: &'a wgpu::TextureView) -> Self {
        self.entry(
            binding,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            wgpu::BindingResource::TextureView(view),
        )
    }

    pub fn sampler(self, binding: u32, sampler: &'a wgpu::Sampler) -> Self {
        self.entry(
            binding,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            wgpu::BindingResource::Sampler(sampler),
        )
    }

    fn entry(
        mut self,
        binding: u32,
        ty: wgpu::BindingType,
        resource: wgpu::BindingResource<'a>,
    ) -> Self {
        self.layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty,
            count: None,
        });
        self.entries.push(wgpu::BindGroupEntry { binding, resource });
        self
    }

    pub fn layout(&self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} bind group layout", self.label)),
            entries: &self.layout_entries,
        })
    }

    /// Creates only the bind group, against a layout built earlier from an identical builder.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.label)),
            layout,
            entries: &self.entries,
        })
    }

    pub fn build(self, device: &wgpu::Device) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
        let layout = self.layout(device);
        let bind_group = self.bind_group(device, &layout);
        (layout, bind_group)
    }
}

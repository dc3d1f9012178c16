use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, channel},
        Arc, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use id_arena::{Arena, Id};
use naga::{
    back::wgsl::WriterFlags,
    valid::{Capabilities, ValidationFlags},
};
use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
};
use notify_debouncer_mini::{
    new_debouncer_opt,
    notify::{RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::PollType;

type PipelineFactory = Box<
    dyn Sync
        + Send
        + Fn(&wgpu::Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
>;

#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    pub name: &'static str,
    /// Relative to the shader folder
    pub path: &'static str,
}

pub struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

pub type PipelineId = Id<PipelineCacheEntry>;

#[derive(Default)]
pub struct PipelineCacheEntry(Option<wgpu::RenderPipeline>);

impl PipelineCacheEntry {
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.0 = Some(pipeline);
    }
}

pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    /// Registers a pipeline built from a shader file. Several pipelines may share a file.
    pub fn add_shader(&mut self, def: ShaderDefinition, factory: PipelineFactory) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineCacheEntry::default());
        self.shaders.alloc(ShaderEntry {
            pipeline_id,
            def,
            factory,
        });
        pipeline_id
    }

    pub fn build(self) -> PipelineCache {
        PipelineCache {
            shaders: Arc::new(self.shaders),
            pipelines: self.pipelines,
        }
    }
}

pub struct PipelineCache {
    shaders: Arc<Arena<ShaderEntry>>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCache {
    pub fn get(&self, id: PipelineId) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(id).and_then(|entry| entry.0.as_ref())
    }

    fn get_entry_mut(&mut self, id: PipelineId) -> Option<&mut PipelineCacheEntry> {
        self.pipelines.get_mut(id)
    }
}

type CompiledPipeline = (&'static str, PipelineId, wgpu::RenderPipeline);

/// Compiles shaders into pipelines and recompiles them in the watcher thread when
/// files under the shader folder change.
pub struct ShaderLoader {
    pub cache: PipelineCache,
    receiver: mpsc::Receiver<CompiledPipeline>,
    _debouncer: Debouncer<RecommendedWatcher>,
}

struct ShaderCompiler {
    device: wgpu::Device,
    shader_folder: PathBuf,
    shared_folder: PathBuf,
    composer: RwLock<Composer>,
}

impl ShaderLoader {
    pub fn new(
        device: wgpu::Device,
        cache_builder: PipelineCacheBuilder,
        shader_folder: &Path,
    ) -> anyhow::Result<Self> {
        let mut cache = cache_builder.build();

        let shader_folder = shader_folder.canonicalize().with_context(|| {
            format!("Shader folder {} not found", shader_folder.display())
        })?;
        let shared_folder = shader_folder.join("shared");

        let compiler = Arc::new(ShaderCompiler {
            composer: RwLock::new(create_composer(&shared_folder)?),
            device,
            shader_folder: shader_folder.clone(),
            shared_folder,
        });

        for (_, shader) in cache.shaders.clone().iter() {
            let pipeline = compiler
                .compile(shader)
                .with_context(|| format!("Failed to compile shader: {}", shader.def.name))?;

            if let Some(entry) = cache.get_entry_mut(shader.pipeline_id) {
                entry.set_pipeline(pipeline);
            }
        }

        let (sender, receiver) = channel();
        let shaders = cache.shaders.clone();

        let mut debouncer = new_debouncer_opt(
            notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }

                        if compiler.on_file_changed(&event.path, &shaders, &sender).is_err() {
                            // The loader was dropped
                            return;
                        }
                    }
                }
                Err(e) => log::error!("Error watching shader files: {}", e),
            },
        )
        .context("Failed to create shader file watcher")?;

        debouncer
            .watcher()
            .watch(&shader_folder, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", shader_folder.display()))?;

        Ok(Self {
            cache,
            receiver,
            _debouncer: debouncer,
        })
    }

    /// Swaps in pipelines recompiled since the last call.
    pub fn load_pending_shaders(&mut self) {
        while let Ok((name, pipeline_id, pipeline)) = self.receiver.try_recv() {
            if let Some(entry) = self.cache.get_entry_mut(pipeline_id) {
                log::info!("Shader reloaded: {}", name);
                entry.set_pipeline(pipeline);
            }
        }
    }
}

impl ShaderCompiler {
    fn on_file_changed(
        &self,
        path: &Path,
        shaders: &Arena<ShaderEntry>,
        sender: &mpsc::Sender<CompiledPipeline>,
    ) -> Result<(), mpsc::SendError<CompiledPipeline>> {
        let shared_changed = path.starts_with(&self.shared_folder);

        if shared_changed {
            match create_composer(&self.shared_folder) {
                Ok(composer) => {
                    if let Ok(mut current) = self.composer.write() {
                        *current = composer;
                    }
                }
                Err(e) => {
                    log::error!("Failed to reload shared shader modules: {:?}", e);
                    return Ok(());
                }
            }
        }

        // A shared module can be imported anywhere, so everything is rebuilt
        let affected = shaders
            .iter()
            .map(|(_, entry)| entry)
            .filter(|entry| shared_changed || path.ends_with(entry.def.path));

        for entry in affected {
            match self.compile(entry) {
                Ok(pipeline) => sender.send((entry.def.name, entry.pipeline_id, pipeline))?,
                Err(e) => log::error!("Failed to load shader {}: {:?}", entry.def.name, e),
            }
        }

        Ok(())
    }

    fn compile(&self, entry: &ShaderEntry) -> anyhow::Result<wgpu::RenderPipeline> {
        let path = self.shader_folder.join(entry.def.path);
        let shader_code = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shader file {}", path.display()))?;

        let file_path = path.to_string_lossy().to_string();

        let module = {
            let mut composer = self
                .composer
                .write()
                .map_err(|_| anyhow::anyhow!("Shader composer lock poisoned"))?;

            composer
                .make_naga_module(NagaModuleDescriptor {
                    file_path: &file_path,
                    source: &shader_code,
                    ..Default::default()
                })
                .context("Failed to create Naga module from shader code")?
        };

        // wgpu runs the validator itself, this is only needed for the writer
        let info = naga::valid::Validator::new(ValidationFlags::empty(), Capabilities::all())
            .validate(&module)
            .context("Failed to validate Naga module")?;

        let shader_code = naga::back::wgsl::write_string(&module, &info, WriterFlags::empty())
            .context("Failed to convert Naga module to WGSL string")?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline = (entry.factory)(&self.device, &entry.def, &shader_code);

        self.device
            .poll(PollType::Wait)
            .context("Failed to poll device after shader compilation")?;

        if let Some(error) = block_on(self.device.pop_error_scope()) {
            anyhow::bail!("Shader compilation failed for {}: {}", entry.def.name, error);
        }

        pipeline
    }
}

fn create_composer(shared_folder: &Path) -> anyhow::Result<Composer> {
    let mut composer = Composer::default();

    let shared_files = std::fs::read_dir(shared_folder).with_context(|| {
        format!(
            "Failed to read shared shader modules directory {}",
            shared_folder.display()
        )
    })?;

    for entry in shared_files {
        let path = entry?.path();

        if !path.is_file() || path.extension().is_none_or(|ext| ext != "wgsl") {
            continue;
        }

        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let file_path = path.to_string_lossy().to_string();

        composer
            .add_composable_module(ComposableModuleDescriptor {
                source: &source,
                file_path: &file_path,
                language: ShaderLanguage::Wgsl,
                ..Default::default()
            })
            .with_context(|| format!("Failed to add shared shader module: {}", file_path))?;
    }

    Ok(composer)
}

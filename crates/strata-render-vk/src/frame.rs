// SPDX-License-Identifier: CEPL-1.0
//! Per-slot GPU resources: layer images, object/vertex buffers, the indirect
//! draw table, uniforms, descriptor sets, command buffers and sync objects.
//!
//! Every buffer and image is sub-allocated from a handful of coarse blocks
//! planned up front by [`FrameLayout::plan`].
use ash::vk;
use strata_render::layout::{SlotLayout, CONTROL_BLOCK, HOST_BLOCK, IMAGE_BLOCK, VERTEX_BLOCK};
use strata_render::{
    feedback_slot, ContextConfig, DrawCommand, FrameLayout, FrameUniforms, MemoryKind,
    ObjectRecord, Region, Requirement, ResourceRequirements,
};
use tracing::{debug, info};

use crate::descriptors::{
    DescriptorRegistry, BINDING_LAYERS, BINDING_OBJECTS, BINDING_PREV_LAYERS,
    BINDING_USER_IMAGES, BINDING_VERTICES,
};
use crate::error::{FrameError, VkResultExt};
use crate::memory::{
    allocate_command_buffers, create_buffer, create_image_2d, create_image_view, submit_one_shot,
    GpuMemoryBlock, COLOR_RANGE,
};
use crate::pipeline::LAYER_FORMAT;
use crate::user_image::{create_user_image, UploadTarget, UserImage};

const OBJECT_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::STORAGE_BUFFER;
const VERTEX_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::from_raw(
    vk::BufferUsageFlags::STORAGE_BUFFER.as_raw() | vk::BufferUsageFlags::VERTEX_BUFFER.as_raw(),
);
const INDIRECT_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::INDIRECT_BUFFER;
const UNIFORM_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::UNIFORM_BUFFER;
const LAYER_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw()
        | vk::ImageUsageFlags::SAMPLED.as_raw()
        | vk::ImageUsageFlags::TRANSFER_SRC.as_raw()
        | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
);

/// Memory type bits each block must satisfy.
#[derive(Debug, Clone, Copy)]
struct TypeBits {
    host: u32,
    vertex: u32,
    control: u32,
    image: u32,
}

fn requirement(r: vk::MemoryRequirements) -> Requirement {
    Requirement {
        size: r.size,
        alignment: r.alignment,
    }
}

/// Creates one resource of each kind, reads its real requirements and
/// destroys it again. All live resources use identical create infos.
unsafe fn probe_requirements(
    device: &ash::Device,
    cfg: &ContextConfig,
) -> Result<(ResourceRequirements, TypeBits), FrameError> {
    let objects = create_buffer(device, cfg.object_buffer_bytes(), OBJECT_USAGE)?;
    let vertices = create_buffer(device, cfg.vertex_buffer_bytes(), VERTEX_USAGE)?;
    let indirect = create_buffer(device, cfg.indirect_buffer_bytes(), INDIRECT_USAGE)?;
    let uniforms = create_buffer(device, cfg.uniform_buffer_bytes(), UNIFORM_USAGE)?;
    let image = create_image_2d(
        device,
        cfg.sprite_width,
        cfg.sprite_height,
        LAYER_FORMAT,
        LAYER_USAGE,
    );

    let o = device.get_buffer_memory_requirements(objects);
    let v = device.get_buffer_memory_requirements(vertices);
    let d = device.get_buffer_memory_requirements(indirect);
    let u = device.get_buffer_memory_requirements(uniforms);
    let i = image
        .as_ref()
        .map(|&img| device.get_image_memory_requirements(img));

    for b in [objects, vertices, indirect, uniforms] {
        device.destroy_buffer(b, None);
    }
    if let Ok(img) = image {
        device.destroy_image(img, None);
    }
    let i = i.map_err(|_| FrameError::Vulkan {
        call: "create_image",
        result: vk::Result::ERROR_INITIALIZATION_FAILED,
    })?;

    Ok((
        ResourceRequirements {
            object_buffer: requirement(o),
            vertex_buffer: requirement(v),
            indirect_buffer: requirement(d),
            uniform_buffer: requirement(u),
            layer_image: requirement(i),
        },
        TypeBits {
            host: o.memory_type_bits,
            vertex: v.memory_type_bits,
            control: d.memory_type_bits & u.memory_type_bits,
            image: i.memory_type_bits,
        },
    ))
}

pub struct LayerResource {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
    pub objects: vk::Buffer,
    pub vertices: vk::Buffer,
    pub storage_set: vk::DescriptorSet,
    objects_ptr: *mut ObjectRecord,
}

pub struct FrameSlot {
    /// Created signaled so the first wait on a fresh slot returns at once.
    pub fence: vk::Fence,
    pub acquired: vk::Semaphore,
    pub layer_cmd: vk::CommandBuffer,
    /// One per swapchain image.
    pub composite: Vec<vk::CommandBuffer>,
    pub indirect: vk::Buffer,
    pub uniforms: vk::Buffer,
    pub sampled_set: vk::DescriptorSet,
    pub uniform_set: vk::DescriptorSet,
    pub layers: Vec<LayerResource>,
    host_block: Option<GpuMemoryBlock>,
    vertex_block: Option<GpuMemoryBlock>,
    control_block: Option<GpuMemoryBlock>,
    draw_ptr: *mut DrawCommand,
    uniform_ptr: *mut FrameUniforms,
}

impl FrameSlot {
    fn empty() -> Self {
        FrameSlot {
            fence: vk::Fence::null(),
            acquired: vk::Semaphore::null(),
            layer_cmd: vk::CommandBuffer::null(),
            composite: Vec::new(),
            indirect: vk::Buffer::null(),
            uniforms: vk::Buffer::null(),
            sampled_set: vk::DescriptorSet::null(),
            uniform_set: vk::DescriptorSet::null(),
            layers: Vec::new(),
            host_block: None,
            vertex_block: None,
            control_block: None,
            draw_ptr: std::ptr::null_mut(),
            uniform_ptr: std::ptr::null_mut(),
        }
    }
}

pub struct FramePool {
    pub slots: Vec<FrameSlot>,
    pub layout: FrameLayout,
    image_block: Option<GpuMemoryBlock>,
    /// 1x1 white image behind every user slot without an upload.
    placeholder: Option<UserImage>,
    object_max: usize,
    layer_max: usize,
}

fn mapped<T>(block: &GpuMemoryBlock, region: Region) -> Result<*mut T, FrameError> {
    block
        .host_ptr(region)
        .map(|p| p.cast::<T>())
        .ok_or(FrameError::Vulkan {
            call: "map_memory",
            result: vk::Result::ERROR_MEMORY_MAP_FAILED,
        })
}

/// Views written into set 0 of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SampledTable {
    pub current: Vec<vk::ImageView>,
    pub previous: Vec<vk::ImageView>,
    pub user: Vec<vk::ImageView>,
}

/// Set 0 contents for `slot`: its own layers, the layers of the slot written
/// one frame earlier, and the placeholder in every user element.
pub(crate) fn sampled_table(
    layer_views: &[Vec<vk::ImageView>],
    slot: usize,
    placeholder: vk::ImageView,
    user_image_max: u32,
) -> SampledTable {
    let prev = feedback_slot(slot, layer_views.len());
    SampledTable {
        current: layer_views[slot].clone(),
        previous: layer_views[prev].clone(),
        user: vec![placeholder; user_image_max as usize],
    }
}

/// Everything the pool needs from the device during construction.
pub(crate) struct PoolInit<'a> {
    pub instance: &'a ash::Instance,
    pub device: &'a ash::Device,
    pub phys: vk::PhysicalDevice,
    pub queue: vk::Queue,
    pub cmd_pool: vk::CommandPool,
    pub registry: &'a DescriptorRegistry,
    pub render_pass: vk::RenderPass,
    pub cfg: &'a ContextConfig,
}

impl FramePool {
    /// Plans the blocks, then creates every slot. On failure everything
    /// created so far is destroyed.
    pub(crate) unsafe fn create(init: &PoolInit) -> Result<Self, FrameError> {
        let cfg = init.cfg;
        let (reqs, bits) = probe_requirements(init.device, cfg)?;
        debug!(
            "requirements: objects {:?}, vertices {:?}, image {:?}",
            reqs.object_buffer, reqs.vertex_buffer, reqs.layer_image
        );
        let layout = FrameLayout::plan(cfg, &reqs)?;

        let mut pool = FramePool {
            slots: Vec::with_capacity(layout.slots.len()),
            layout,
            image_block: None,
            placeholder: None,
            object_max: cfg.object_max as usize,
            layer_max: cfg.layer_max as usize,
        };
        if let Err(e) = pool.build(init, bits) {
            pool.destroy(init.device, init.cmd_pool);
            return Err(e);
        }

        info!(
            "frame pool: {} slots x {} layers, images {} / {} bytes",
            pool.slots.len(),
            pool.layer_max,
            pool.layout.image_used,
            pool.layout.image_capacity
        );
        Ok(pool)
    }

    unsafe fn build(&mut self, init: &PoolInit, bits: TypeBits) -> Result<(), FrameError> {
        let device = init.device;
        let cfg = init.cfg;

        let image_block = self.image_block.insert(GpuMemoryBlock::allocate(
            init.instance,
            device,
            init.phys,
            IMAGE_BLOCK,
            self.layout.image_capacity,
            MemoryKind::DeviceLocal,
            bits.image,
        )?);

        let fifo = self.layout.slots.len();
        let sampled = init
            .registry
            .allocate(device, init.registry.sampled_layout, fifo)?;
        let uniform = init
            .registry
            .allocate(device, init.registry.uniform_layout, fifo)?;
        let storage = init
            .registry
            .allocate(device, init.registry.storage_layout, fifo * self.layer_max)?;
        let cmds = allocate_command_buffers(device, init.cmd_pool, fifo as u32)?;

        for s in 0..fifo {
            self.slots.push(FrameSlot::empty());
            let slot = &mut self.slots[s];
            slot.sampled_set = sampled[s];
            slot.uniform_set = uniform[s];
            slot.layer_cmd = cmds[s];
            let storage_sets = &storage[s * self.layer_max..(s + 1) * self.layer_max];
            Self::build_slot(
                init,
                bits,
                &self.layout.slots[s],
                image_block,
                storage_sets,
                slot,
            )?;
        }

        let target = UploadTarget {
            instance: init.instance,
            device,
            phys: init.phys,
            cmd_pool: init.cmd_pool,
        };
        let placeholder = self.placeholder.insert(create_user_image(&target, 1, 1)?).view;

        // Feedback: set 0 binding 1 of slot n sees the layers of slot n-1.
        let views: Vec<Vec<vk::ImageView>> = self
            .slots
            .iter()
            .map(|s| s.layers.iter().map(|l| l.view).collect())
            .collect();
        let reg = init.registry;
        for s in 0..fifo {
            let table = sampled_table(&views, s, placeholder, cfg.user_image_max);
            let set = self.slots[s].sampled_set;
            let general = vk::ImageLayout::GENERAL;
            reg.write_images(device, set, BINDING_LAYERS, 0, &table.current, general);
            reg.write_images(device, set, BINDING_PREV_LAYERS, 0, &table.previous, general);
            reg.write_images(device, set, BINDING_USER_IMAGES, 0, &table.user, general);
        }

        self.initialize_images(device, init.queue, init.cmd_pool, cfg.clear_color)
    }

    unsafe fn build_slot(
        init: &PoolInit,
        bits: TypeBits,
        plan: &SlotLayout,
        image_block: &mut GpuMemoryBlock,
        storage_sets: &[vk::DescriptorSet],
        slot: &mut FrameSlot,
    ) -> Result<(), FrameError> {
        let device = init.device;
        let cfg = init.cfg;

        let fci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: vk::FenceCreateFlags::SIGNALED,
            ..Default::default()
        };
        slot.fence = device.create_fence(&fci, None).vk("create_fence")?;
        slot.acquired = device
            .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
            .vk("create_semaphore")?;

        let host = slot.host_block.insert(GpuMemoryBlock::allocate(
            init.instance,
            device,
            init.phys,
            HOST_BLOCK,
            plan.host_capacity,
            MemoryKind::HostVisible,
            bits.host,
        )?);
        let vertex = slot.vertex_block.insert(GpuMemoryBlock::allocate(
            init.instance,
            device,
            init.phys,
            VERTEX_BLOCK,
            plan.vertex_capacity,
            MemoryKind::DeviceLocal,
            bits.vertex,
        )?);
        let control = slot.control_block.insert(GpuMemoryBlock::allocate(
            init.instance,
            device,
            init.phys,
            CONTROL_BLOCK,
            plan.control_capacity,
            MemoryKind::HostVisible,
            bits.control,
        )?);

        slot.indirect = create_buffer(device, cfg.indirect_buffer_bytes(), INDIRECT_USAGE)?;
        let region = control.bind_buffer(device, slot.indirect)?;
        debug_assert_eq!(region, plan.indirect);
        slot.draw_ptr = mapped(control, region)?;
        slot.uniforms = create_buffer(device, cfg.uniform_buffer_bytes(), UNIFORM_USAGE)?;
        let region = control.bind_buffer(device, slot.uniforms)?;
        debug_assert_eq!(region, plan.uniforms);
        slot.uniform_ptr = mapped(control, region)?;

        // Nothing draws until the caller sets a count.
        std::ptr::write_bytes(slot.draw_ptr, 0, cfg.layer_max as usize);
        std::ptr::write_bytes(slot.uniform_ptr, 0, 1);

        for (layer, regions) in plan.layers.iter().enumerate() {
            // Pushed first so a failure below still gets the partial layer destroyed.
            slot.layers.push(LayerResource {
                image: vk::Image::null(),
                view: vk::ImageView::null(),
                framebuffer: vk::Framebuffer::null(),
                objects: vk::Buffer::null(),
                vertices: vk::Buffer::null(),
                storage_set: storage_sets[layer],
                objects_ptr: std::ptr::null_mut(),
            });
            let res = &mut slot.layers[layer];

            res.objects = create_buffer(device, cfg.object_buffer_bytes(), OBJECT_USAGE)?;
            let region = host.bind_buffer(device, res.objects)?;
            debug_assert_eq!(region, regions.object);
            res.objects_ptr = mapped(host, region)?;
            std::ptr::write_bytes(res.objects_ptr, 0, cfg.object_max as usize);

            res.vertices = create_buffer(device, cfg.vertex_buffer_bytes(), VERTEX_USAGE)?;
            let region = vertex.bind_buffer(device, res.vertices)?;
            debug_assert_eq!(region, regions.vertex);

            res.image = create_image_2d(
                device,
                cfg.sprite_width,
                cfg.sprite_height,
                LAYER_FORMAT,
                LAYER_USAGE,
            )?;
            let region = image_block.bind_image(device, res.image)?;
            debug_assert_eq!(region, regions.image);
            res.view = create_image_view(device, res.image, LAYER_FORMAT)?;

            let fb_info = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass: init.render_pass,
                attachment_count: 1,
                p_attachments: &res.view,
                width: cfg.sprite_width,
                height: cfg.sprite_height,
                layers: 1,
                ..Default::default()
            };
            res.framebuffer = device
                .create_framebuffer(&fb_info, None)
                .vk("create_framebuffer")?;

            init.registry.write_buffer(
                device,
                res.storage_set,
                BINDING_OBJECTS,
                vk::DescriptorType::STORAGE_BUFFER,
                res.objects,
                cfg.object_buffer_bytes(),
            );
            init.registry.write_buffer(
                device,
                res.storage_set,
                BINDING_VERTICES,
                vk::DescriptorType::STORAGE_BUFFER,
                res.vertices,
                cfg.vertex_buffer_bytes(),
            );
        }

        init.registry.write_uniform_table(
            device,
            slot.uniform_set,
            cfg.descriptor_array_max,
            slot.uniforms,
            cfg.uniform_buffer_bytes(),
        );
        Ok(())
    }

    /// Moves every layer image and the placeholder to GENERAL, clears the
    /// layers to `clear` and the placeholder to white.
    unsafe fn initialize_images(
        &self,
        device: &ash::Device,
        queue: vk::Queue,
        cmd_pool: vk::CommandPool,
        clear: [f32; 4],
    ) -> Result<(), FrameError> {
        let images: Vec<vk::Image> = self
            .slots
            .iter()
            .flat_map(|s| s.layers.iter().map(|l| l.image))
            .collect();
        let placeholder = self.placeholder.as_ref().map(|p| p.image);
        submit_one_shot(device, queue, cmd_pool, |cmd| {
            let to_general: Vec<_> = images
                .iter()
                .chain(placeholder.iter())
                .map(|&image| vk::ImageMemoryBarrier {
                    s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
                    dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                    old_layout: vk::ImageLayout::UNDEFINED,
                    new_layout: vk::ImageLayout::GENERAL,
                    src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    image,
                    subresource_range: COLOR_RANGE,
                    ..Default::default()
                })
                .collect();
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &to_general,
            );
            let color = vk::ClearColorValue { float32: clear };
            for &image in &images {
                device.cmd_clear_color_image(
                    cmd,
                    image,
                    vk::ImageLayout::GENERAL,
                    &color,
                    std::slice::from_ref(&COLOR_RANGE),
                );
            }
            if let Some(image) = placeholder {
                let white = vk::ClearColorValue { float32: [1.0; 4] };
                device.cmd_clear_color_image(
                    cmd,
                    image,
                    vk::ImageLayout::GENERAL,
                    &white,
                    std::slice::from_ref(&COLOR_RANGE),
                );
            }
        })
    }

    /// Frees the composite command buffers and allocates `image_count` new
    /// ones per slot. Only call with every slot idle.
    pub(crate) unsafe fn reset_composites(
        &mut self,
        device: &ash::Device,
        cmd_pool: vk::CommandPool,
        image_count: usize,
    ) -> Result<(), FrameError> {
        for slot in &mut self.slots {
            if !slot.composite.is_empty() {
                device.free_command_buffers(cmd_pool, &slot.composite);
                slot.composite.clear();
            }
            slot.composite = allocate_command_buffers(device, cmd_pool, image_count as u32)?;
        }
        Ok(())
    }

    /// Object records of `layer` in `slot`. The caller guarantees the slot
    /// is not in flight.
    pub(crate) fn objects_mut(&mut self, slot: usize, layer: usize) -> Option<&mut [ObjectRecord]> {
        let res = self.slots.get(slot)?.layers.get(layer)?;
        // SAFETY: host-visible mapping of object_max records, exclusively
        // borrowed through &mut self.
        Some(unsafe { std::slice::from_raw_parts_mut(res.objects_ptr, self.object_max) })
    }

    pub(crate) fn draws_mut(&mut self, slot: usize) -> Option<&mut [DrawCommand]> {
        let s = self.slots.get(slot)?;
        // SAFETY: host-visible mapping of layer_max commands.
        Some(unsafe { std::slice::from_raw_parts_mut(s.draw_ptr, self.layer_max) })
    }

    pub(crate) fn write_uniforms(&mut self, slot: usize, uniforms: FrameUniforms) {
        if let Some(s) = self.slots.get(slot) {
            // SAFETY: host-visible, sized for one FrameUniforms.
            unsafe { s.uniform_ptr.write(uniforms) };
        }
    }

    /// Host plus device bytes in use across every block.
    pub fn memory_used(&self) -> u64 {
        let per_slot: u64 = self
            .slots
            .iter()
            .flat_map(|s| [&s.host_block, &s.vertex_block, &s.control_block])
            .flatten()
            .map(|b| b.used())
            .sum();
        per_slot + self.image_block.as_ref().map_or(0, |b| b.used())
    }

    /// Descriptor sets go back with the pool; command buffers with theirs.
    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device, cmd_pool: vk::CommandPool) {
        for slot in self.slots.drain(..) {
            for l in &slot.layers {
                device.destroy_framebuffer(l.framebuffer, None);
                device.destroy_image_view(l.view, None);
                device.destroy_image(l.image, None);
                device.destroy_buffer(l.vertices, None);
                device.destroy_buffer(l.objects, None);
            }
            device.destroy_buffer(slot.uniforms, None);
            device.destroy_buffer(slot.indirect, None);
            for block in [&slot.control_block, &slot.vertex_block, &slot.host_block]
                .into_iter()
                .flatten()
            {
                block.destroy(device);
            }
            if !slot.composite.is_empty() {
                device.free_command_buffers(cmd_pool, &slot.composite);
            }
            if slot.layer_cmd != vk::CommandBuffer::null() {
                device.free_command_buffers(cmd_pool, std::slice::from_ref(&slot.layer_cmd));
            }
            device.destroy_semaphore(slot.acquired, None);
            device.destroy_fence(slot.fence, None);
        }
        if let Some(p) = self.placeholder.take() {
            p.destroy(device);
        }
        if let Some(block) = self.image_block.take() {
            block.destroy(device);
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;

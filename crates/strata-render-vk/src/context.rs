// SPDX-License-Identifier: CEPL-1.0
use ash::khr::{surface, swapchain};
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use strata_render::records::write_draw;
use strata_render::upload::validate_upload;
use strata_render::{
    ContextConfig, FramePhase, FrameRing, FrameStatus, FrameUniforms, ObjectRecord, RenderSize,
    Renderer, ScheduleError, ShaderProvider, ShaderSet, SlotState, UploadId, UploadQueue,
};
use tracing::{debug, info, warn};

use crate::descriptors::{DescriptorRegistry, BINDING_USER_IMAGES};
use crate::device::{
    create_device, create_surface, destroy_debug_messenger, init_instance_and_surface,
    log_device_info, pick_device_and_queue, query_device_info, DebugState, DeviceInfo,
};
use crate::error::{classify_present, FrameError, VkResultExt};
use crate::frame::{FramePool, PoolInit};
use crate::pipeline::PipelineSet;
use crate::record::{record_all, record_composite, record_layers, RecordParams};
use crate::swapchain::{create_swapchain_bundle, SwapchainBundle};
use crate::user_image::{stage_upload, StagedUpload, UploadTarget, UserImage};

/// Owns every Vulkan object of one render context. Holds mapped pointers,
/// so it stays on the thread that created it.
pub struct VkContext {
    entry: Entry,
    instance: Instance,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
    debug: DebugState,

    phys: vk::PhysicalDevice,
    info: DeviceInfo,
    device: ash::Device,
    queue: vk::Queue,

    swapchain_loader: swapchain::Device,
    swapchain: Option<SwapchainBundle>,

    cmd_pool: vk::CommandPool,
    registry: DescriptorRegistry,
    pipelines: PipelineSet,
    frames: FramePool,

    ring: FrameRing,
    uploads: UploadQueue,
    staged: Vec<StagedUpload>,
    user_images: Vec<Option<UserImage>>,

    config: ContextConfig,
    clear: [f32; 4],
    size: RenderSize,
    paused: bool,
}

impl Drop for VkContext {
    fn drop(&mut self) {
        unsafe {
            // STRICT TEARDOWN ORDER:
            // 1) GPU idle
            // 2) uploads, user images, frame pool, pipelines, descriptors, command pool
            // 3) swapchain, device
            // 4) surface, debug messenger, instance
            let d = &self.device;
            if let Err(e) = d.device_wait_idle() {
                warn!("device_wait_idle during teardown: {e:?}");
            }

            for s in self.staged.drain(..) {
                s.destroy(d, self.cmd_pool);
            }
            for img in self.user_images.iter().flatten() {
                img.destroy(d);
            }
            self.frames.destroy(d, self.cmd_pool);
            self.pipelines.destroy(d);
            self.registry.destroy(d);
            d.destroy_command_pool(self.cmd_pool, None);

            if let Some(sc) = self.swapchain.take() {
                sc.destroy(d, &self.swapchain_loader);
            }
            d.destroy_device(None);

            self.surface_loader.destroy_surface(self.surface, None);
            destroy_debug_messenger(&self.entry, &self.instance, self.debug);
            self.instance.destroy_instance(None);
        }
    }
}

/// Device-level objects built once the logical device exists. Anything
/// created before a failure is destroyed here.
unsafe fn build_on_device(
    instance: &Instance,
    device: &ash::Device,
    phys: vk::PhysicalDevice,
    queue: vk::Queue,
    queue_family: u32,
    shaders: &ShaderSet,
    cfg: &ContextConfig,
) -> Result<(vk::CommandPool, DescriptorRegistry, PipelineSet, FramePool), FrameError> {
    let pool_info = vk::CommandPoolCreateInfo {
        s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        queue_family_index: queue_family,
        ..Default::default()
    };
    let cmd_pool = device
        .create_command_pool(&pool_info, None)
        .vk("create_command_pool")?;

    let registry = match DescriptorRegistry::new(device, cfg) {
        Ok(r) => r,
        Err(e) => {
            device.destroy_command_pool(cmd_pool, None);
            return Err(e);
        }
    };
    let pipelines = match PipelineSet::build(device, registry.pipeline_layout, shaders, cfg) {
        Ok(p) => p,
        Err(e) => {
            registry.destroy(device);
            device.destroy_command_pool(cmd_pool, None);
            return Err(e);
        }
    };
    let init = PoolInit {
        instance,
        device,
        phys,
        queue,
        cmd_pool,
        registry: &registry,
        render_pass: pipelines.render_pass,
        cfg,
    };
    let frames = match FramePool::create(&init) {
        Ok(f) => f,
        Err(e) => {
            pipelines.destroy(device);
            registry.destroy(device);
            device.destroy_command_pool(cmd_pool, None);
            return Err(e);
        }
    };
    Ok((cmd_pool, registry, pipelines, frames))
}

impl VkContext {
    unsafe fn build(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        config: &ContextConfig,
        shaders: &dyn ShaderProvider,
    ) -> Result<Self, FrameError> {
        config.validate()?;
        // Bytecode problems surface before any Vulkan object exists.
        let shader_set = ShaderSet::resolve(shaders, &config.programs())?;

        let bundle = init_instance_and_surface(window, display)?;
        let destroy_bundle = |b: &crate::device::InstanceBundle| {
            b.surface_loader.destroy_surface(b.surface, None);
            destroy_debug_messenger(&b.entry, &b.instance, b.debug);
            b.instance.destroy_instance(None);
        };

        let picked = pick_device_and_queue(&bundle.instance, &bundle.surface_loader, bundle.surface)
            .and_then(|(phys, qf)| {
                let info = query_device_info(&bundle.instance, phys, qf);
                log_device_info(&info);
                config.validate_for_device(&info.limits)?;
                let (device, queue) = create_device(&bundle.instance, phys, qf)?;
                Ok((phys, info, device, queue))
            });
        let (phys, info, device, queue) = match picked {
            Ok(p) => p,
            Err(e) => {
                destroy_bundle(&bundle);
                return Err(e);
            }
        };

        let (cmd_pool, registry, pipelines, frames) = match build_on_device(
            &bundle.instance,
            &device,
            phys,
            queue,
            info.queue_family,
            &shader_set,
            config,
        ) {
            Ok(parts) => parts,
            Err(e) => {
                device.destroy_device(None);
                destroy_bundle(&bundle);
                return Err(e);
            }
        };

        let swapchain_loader = swapchain::Device::new(&bundle.instance, &device);
        let crate::device::InstanceBundle {
            entry,
            instance,
            surface_loader,
            surface,
            debug,
        } = bundle;

        let mut ctx = VkContext {
            entry,
            instance,
            surface_loader,
            surface,
            debug,
            phys,
            info,
            device,
            queue,
            swapchain_loader,
            swapchain: None,
            cmd_pool,
            registry,
            pipelines,
            frames,
            ring: FrameRing::new(config.frame_fifo_max as usize),
            uploads: UploadQueue::default(),
            staged: Vec::new(),
            user_images: (0..config.user_image_max).map(|_| None).collect(),
            config: config.clone(),
            clear: config.clear_color,
            size,
            paused: size.is_empty(),
        };

        // From here on Drop owns cleanup.
        for slot in &ctx.frames.slots {
            record_layers(&ctx.device, slot, &ctx.pipelines, &ctx.record_params())?;
        }
        if !ctx.paused {
            ctx.rebuild_swapchain()?;
        }
        info!(
            "context ready: {} slots, {} layers, sprite {}x{}, {} bytes of device memory planned",
            config.frame_fifo_max,
            config.layer_max,
            config.sprite_width,
            config.sprite_height,
            ctx.frames.memory_used()
        );
        Ok(ctx)
    }

    fn record_params(&self) -> RecordParams {
        RecordParams {
            pipeline_layout: self.registry.pipeline_layout,
            sprite: RenderSize {
                width: self.config.sprite_width,
                height: self.config.sprite_height,
            },
            object_max: self.config.object_max,
            clear: self.clear,
            linear_blit: self.info.limits.linear_blit,
        }
    }

    fn timeout_ns(&self) -> u64 {
        self.config.fence_timeout_ms.saturating_mul(1_000_000)
    }

    /// Bounded wait on one slot's fence, then frees what that slot carried.
    unsafe fn wait_slot(&mut self, slot: usize) -> Result<(), FrameError> {
        let fence = self.frames.slots[slot].fence;
        match self
            .device
            .wait_for_fences(std::slice::from_ref(&fence), true, self.timeout_ns())
        {
            Ok(()) => {}
            Err(vk::Result::TIMEOUT) => {
                return Err(FrameError::FrameTimeout {
                    slot,
                    timeout_ms: self.config.fence_timeout_ms,
                })
            }
            Err(e) => return Err(e).vk("wait_for_fences"),
        }
        self.ring.mark_signaled(slot);
        self.retire_uploads(slot);
        Ok(())
    }

    fn retire_uploads(&mut self, slot: usize) {
        let done = self.uploads.retire(slot);
        if done.is_empty() {
            return;
        }
        self.release_staged(&done);
        debug!("slot {slot}: retired {} upload(s)", done.len());
    }

    fn release_staged(&mut self, ids: &[UploadId]) {
        let (gone, keep): (Vec<_>, Vec<_>) =
            self.staged.drain(..).partition(|s| ids.contains(&s.id));
        self.staged = keep;
        for s in gone {
            debug!("upload {:?} (user image {}) released", s.id, s.image_slot);
            // SAFETY: the transfer never ran or its fence has signaled.
            unsafe { s.destroy(&self.device, self.cmd_pool) };
        }
    }

    /// Waits every in-flight slot. Afterwards nothing recorded is pending on
    /// the GPU and descriptors may be rewritten.
    unsafe fn wait_in_flight(&mut self) -> Result<(), FrameError> {
        let busy: Vec<usize> = self.ring.in_flight().collect();
        for slot in busy {
            self.wait_slot(slot)?;
        }
        Ok(())
    }

    /// Moves the ring to `Acquiring` for the current slot, waiting its fence
    /// only if it is still in flight. Idempotent within one frame.
    unsafe fn ensure_current_writable(&mut self) -> Result<usize, FrameError> {
        if self.ring.phase() == FramePhase::Acquiring {
            return Ok(self.ring.current_slot());
        }
        self.ring.begin_frame()?;
        let slot = self.ring.current_slot();
        if self.ring.slot_state(slot) == SlotState::InFlight {
            if let Err(e) = self.wait_slot(slot) {
                self.ring.abandon()?;
                return Err(e);
            }
        }
        self.ring.fence_signaled()?;
        Ok(slot)
    }

    /// Fences cover submitted batches only. Presents and released acquires
    /// still reference swapchain semaphores until the queue drains.
    unsafe fn wait_queue_idle(&mut self) -> Result<(), FrameError> {
        self.wait_in_flight()?;
        if self.ring.has_unfenced_work() {
            self.device.device_wait_idle().vk("device_wait_idle")?;
            self.ring.queue_idle();
        }
        Ok(())
    }

    unsafe fn rebuild_swapchain(&mut self) -> Result<(), FrameError> {
        self.wait_queue_idle()?;
        let old = self.swapchain.take();
        let created = create_swapchain_bundle(
            &self.device,
            &self.surface_loader,
            &self.swapchain_loader,
            self.phys,
            self.surface,
            old.as_ref().map_or(vk::SwapchainKHR::null(), |o| o.swapchain),
            self.size,
            self.config.frame_fifo_max,
            self.config.vsync,
        );
        if let Some(old) = old {
            old.destroy(&self.device, &self.swapchain_loader);
        }
        let Some(sc) = created? else {
            debug!("surface has no area, pausing");
            self.paused = true;
            return Ok(());
        };

        self.frames
            .reset_composites(&self.device, self.cmd_pool, sc.images.len())?;
        let params = self.record_params();
        for slot in &self.frames.slots {
            for (&cmd, &image) in slot.composite.iter().zip(&sc.images) {
                record_composite(&self.device, cmd, slot, image, sc.size(), &params)?;
            }
        }
        self.swapchain = Some(sc);
        Ok(())
    }

    /// Re-records every slot after descriptor or clear color changes.
    unsafe fn rerecord(&mut self) -> Result<(), FrameError> {
        self.wait_in_flight()?;
        let images = self
            .swapchain
            .as_ref()
            .map(|s| (s.images.clone(), s.size()))
            .unwrap_or((
                Vec::new(),
                RenderSize {
                    width: 0,
                    height: 0,
                },
            ));
        record_all(
            &self.device,
            &self.frames.slots,
            &self.pipelines,
            &images.0,
            images.1,
            &self.record_params(),
        )
    }

    /// Replaces a lost surface. The device is kept; the queue family must be
    /// able to present to the new surface.
    pub fn recreate_surface(
        &mut self,
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
    ) -> Result<(), FrameError> {
        unsafe {
            self.wait_queue_idle()?;
            if let Some(sc) = self.swapchain.take() {
                sc.destroy(&self.device, &self.swapchain_loader);
            }
            self.surface_loader.destroy_surface(self.surface, None);
            self.surface = vk::SurfaceKHR::null();

            self.surface = create_surface(&self.entry, &self.instance, window, display)?;
            let supported = self
                .surface_loader
                .get_physical_device_surface_support(
                    self.phys,
                    self.info.queue_family,
                    self.surface,
                )
                .vk("get_physical_device_surface_support")?;
            if !supported {
                return Err(FrameError::SurfaceLost);
            }
            info!("surface recreated");
            self.size = size;
            self.paused = size.is_empty();
            if self.paused {
                return Ok(());
            }
            self.rebuild_swapchain()
        }
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn frame_count(&self) -> u64 {
        self.ring.frame_count()
    }

    pub fn current_slot(&self) -> usize {
        self.ring.current_slot()
    }

    /// Extent of the image last uploaded to user slot `slot`.
    pub fn user_image_size(&self, slot: u32) -> Option<RenderSize> {
        self.user_images
            .get(slot as usize)?
            .as_ref()
            .map(|img| RenderSize {
                width: img.width,
                height: img.height,
            })
    }

    pub fn surface_size(&self) -> Option<RenderSize> {
        self.swapchain.as_ref().map(|s| s.size())
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Unwinds a frame that will not be submitted. A held image's acquired
    /// semaphore is consumed by a wait-only submit; that submit also
    /// re-signals the slot's fence if it was already reset.
    unsafe fn abort_frame(&mut self, slot: usize) {
        if self.ring.holds_image() {
            let fs = &self.frames.slots[slot];
            let (fence, acquired) = (fs.fence, fs.acquired);
            let reset = matches!(self.device.get_fence_status(fence), Ok(false));
            let wait_stage = vk::PipelineStageFlags::ALL_COMMANDS;
            let release = vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                wait_semaphore_count: 1,
                p_wait_semaphores: &acquired,
                p_wait_dst_stage_mask: &wait_stage,
                ..Default::default()
            };
            let signal = if reset { fence } else { vk::Fence::null() };
            match self
                .device
                .queue_submit(self.queue, std::slice::from_ref(&release), signal)
            {
                Ok(()) if reset => {
                    if let Err(e) = self.device.wait_for_fences(
                        std::slice::from_ref(&fence),
                        true,
                        self.timeout_ns(),
                    ) {
                        warn!("slot {slot}: fence after released acquire: {e:?}");
                    }
                }
                Ok(()) => {}
                Err(e) => warn!("slot {slot}: releasing acquired image: {e:?}"),
            }
        }
        if let Err(e) = self.ring.abandon() {
            warn!("{e}");
        }
    }

    /// Uniforms, fence reset and the two-batch submit for an acquired image.
    /// Returns the image's present semaphore, or `None` when the swapchain
    /// no longer matches the recorded composites and nothing was submitted.
    unsafe fn submit_acquired(
        &mut self,
        slot: usize,
        image: usize,
        extent: vk::Extent2D,
    ) -> Result<Option<vk::Semaphore>, FrameError> {
        let fs = &self.frames.slots[slot];
        let (fence, layer_cmd, acquired) = (fs.fence, fs.layer_cmd, fs.acquired);
        let Some(&composite) = fs.composite.get(image) else {
            return Ok(None);
        };
        let Some(&ready) = self.swapchain.as_ref().and_then(|s| s.ready.get(image)) else {
            return Ok(None);
        };

        self.frames.write_uniforms(
            slot,
            FrameUniforms {
                surface_size: [extent.width as f32, extent.height as f32],
                sprite_size: [
                    self.config.sprite_width as f32,
                    self.config.sprite_height as f32,
                ],
                frame: self.ring.frame_count() as u32,
                slot: slot as u32,
                layer_count: self.config.layer_max,
                object_max: self.config.object_max,
            },
        );

        // Only now: every early exit above leaves the fence signaled.
        self.device
            .reset_fences(std::slice::from_ref(&fence))
            .vk("reset_fences")?;

        let taken = self.uploads.take_pending(slot);
        let mut first_cmds: Vec<vk::CommandBuffer> = self
            .staged
            .iter()
            .filter(|s| taken.contains(&s.id))
            .map(|s| s.cmd)
            .collect();
        first_cmds.push(layer_cmd);

        let wait_stage = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
        let batches = [
            vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                command_buffer_count: first_cmds.len() as u32,
                p_command_buffers: first_cmds.as_ptr(),
                ..Default::default()
            },
            vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                wait_semaphore_count: 1,
                p_wait_semaphores: &acquired,
                p_wait_dst_stage_mask: &wait_stage,
                command_buffer_count: 1,
                p_command_buffers: &composite,
                signal_semaphore_count: 1,
                p_signal_semaphores: &ready,
                ..Default::default()
            },
        ];
        if let Err(e) = self.device.queue_submit(self.queue, &batches, fence) {
            self.uploads.restore(&taken);
            return Err(e).vk("queue_submit");
        }
        Ok(Some(ready))
    }

    unsafe fn present_frame(&mut self) -> Result<FrameStatus, FrameError> {
        let slot = self.ensure_current_writable()?;
        let Some(sc) = self.swapchain.as_ref() else {
            self.ring.abandon()?;
            return Ok(FrameStatus::Paused);
        };
        let (swapchain, extent) = (sc.swapchain, sc.extent);
        let acquired = self.frames.slots[slot].acquired;

        // 1) acquire; the fence is still signaled if this fails
        let image_index = match self.swapchain_loader.acquire_next_image(
            swapchain,
            self.timeout_ns(),
            acquired,
            vk::Fence::null(),
        ) {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.ring.abandon()?;
                self.rebuild_swapchain()?;
                return Ok(FrameStatus::SwapchainRebuilt);
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                self.ring.abandon()?;
                warn!("acquire_next_image timed out, frame skipped");
                return Ok(FrameStatus::Skipped);
            }
            Err(e) => {
                self.ring.abandon()?;
                return Err(e).vk("acquire_next_image");
            }
        };
        if let Err(e) = self.ring.image_acquired() {
            self.abort_frame(slot);
            return Err(e.into());
        }

        // 2) uniforms + submit: [transfers + layers] then [composite]
        let ready = match self.submit_acquired(slot, image_index as usize, extent) {
            Ok(Some(ready)) => ready,
            Ok(None) => {
                self.abort_frame(slot);
                self.rebuild_swapchain()?;
                return Ok(FrameStatus::SwapchainRebuilt);
            }
            Err(e) => {
                self.abort_frame(slot);
                return Err(e);
            }
        };
        self.ring.submitted()?;

        // 3) present
        let present = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: &ready,
            swapchain_count: 1,
            p_swapchains: &swapchain,
            p_image_indices: &image_index,
            ..Default::default()
        };
        let presented = self.swapchain_loader.queue_present(self.queue, &present);
        self.ring.presented()?;
        self.ring.advance()?;

        match presented {
            Ok(false) => Ok(FrameStatus::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.rebuild_swapchain()?;
                Ok(FrameStatus::SwapchainRebuilt)
            }
            Err(e) => match classify_present(e) {
                FrameError::PresentFailure(r) => {
                    warn!("queue_present: {r:?}, frame skipped");
                    Ok(FrameStatus::Skipped)
                }
                other => Err(other),
            },
        }
    }
}

impl Renderer for VkContext {
    type Error = FrameError;

    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        config: &ContextConfig,
        shaders: &dyn ShaderProvider,
    ) -> Result<Self, FrameError> {
        unsafe { Self::build(window, display, size, config, shaders) }
    }

    fn resize(&mut self, size: RenderSize) -> Result<(), FrameError> {
        self.size = size;
        if size.is_empty() {
            if !self.paused {
                debug!("surface is 0x0, pausing");
            }
            self.paused = true;
            return Ok(());
        }
        self.paused = false;
        unsafe { self.rebuild_swapchain() }
    }

    fn objects_mut(&mut self, layer: usize) -> Result<&mut [ObjectRecord], FrameError> {
        let slot = unsafe { self.ensure_current_writable()? };
        self.ring.ensure_writable(slot)?;
        let layer_max = self.config.layer_max as usize;
        self.frames
            .objects_mut(slot, layer)
            .ok_or(FrameError::Schedule(ScheduleError::LayerOutOfRange {
                layer,
                layer_max,
            }))
    }

    fn draw(&mut self, layer: usize, vertex_count: u32) -> Result<(), FrameError> {
        let slot = unsafe { self.ensure_current_writable()? };
        self.ring.ensure_writable(slot)?;
        let capacity = self.config.vertex_capacity();
        let layer_max = self.config.layer_max as usize;
        let table = self
            .frames
            .draws_mut(slot)
            .ok_or(FrameError::Schedule(ScheduleError::LayerOutOfRange {
                layer,
                layer_max,
            }))?;
        write_draw(table, layer, vertex_count, capacity)?;
        Ok(())
    }

    fn submit(&mut self) -> Result<FrameStatus, FrameError> {
        if self.paused {
            return Ok(FrameStatus::Paused);
        }
        unsafe {
            if self.swapchain.is_none() {
                self.rebuild_swapchain()?;
                if self.paused {
                    return Ok(FrameStatus::Paused);
                }
            }
            self.present_frame()
        }
    }

    fn upload_user_image(
        &mut self,
        slot: u32,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), FrameError> {
        validate_upload(
            slot,
            width,
            height,
            rgba.len(),
            self.config.user_image_max,
            self.info.limits.max_image_dimension_2d,
        )?;
        unsafe {
            self.wait_in_flight()?;

            // A newer upload to the same slot replaces one not yet submitted.
            let superseded: Vec<UploadId> = self.uploads.pending_for(slot).collect();
            for &id in &superseded {
                self.uploads.cancel(id);
            }
            self.release_staged(&superseded);

            let id = self.uploads.enqueue(slot);
            let target = UploadTarget {
                instance: &self.instance,
                device: &self.device,
                phys: self.phys,
                cmd_pool: self.cmd_pool,
            };
            let (image, staged) = match stage_upload(&target, id, slot, width, height, rgba) {
                Ok(parts) => parts,
                Err(e) => {
                    self.uploads.cancel(id);
                    return Err(e);
                }
            };
            self.staged.push(staged);
            let view = image.view;
            if let Some(old) = self.user_images[slot as usize].replace(image) {
                old.destroy(&self.device);
            }

            for fs in &self.frames.slots {
                self.registry.write_images(
                    &self.device,
                    fs.sampled_set,
                    BINDING_USER_IMAGES,
                    slot,
                    std::slice::from_ref(&view),
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            }
            // Updated sets invalidate the buffers that bound them.
            self.rerecord()?;
        }
        info!("user image {slot}: {width}x{height} queued");
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) -> Result<(), FrameError> {
        self.clear = rgba;
        unsafe { self.rerecord() }
    }
}

// SPDX-License-Identifier: CEPL-1.0
//! Command buffer recording. Layer command buffers are recorded once per
//! slot and replayed every frame; only the mapped buffers change between
//! frames.
use ash::vk;
use strata_render::blit::{plan_blit, BlitFilter, BlitRect};
use strata_render::{DrawCommand, RenderSize};

use crate::descriptors::{SET_SAMPLED, SET_STORAGE};
use crate::error::{FrameError, VkResultExt};
use crate::frame::FrameSlot;
use crate::memory::COLOR_RANGE;
use crate::pipeline::PipelineSet;

/// Fixed inputs shared by every recording.
pub(crate) struct RecordParams {
    pub pipeline_layout: vk::PipelineLayout,
    pub sprite: RenderSize,
    pub object_max: u32,
    pub clear: [f32; 4],
    pub linear_blit: bool,
}

fn image_barrier(
    image: vk::Image,
    src_access_mask: vk::AccessFlags,
    dst_access_mask: vk::AccessFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
        src_access_mask,
        dst_access_mask,
        old_layout,
        new_layout,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: COLOR_RANGE,
        ..Default::default()
    }
}

fn offsets(r: BlitRect) -> [vk::Offset3D; 2] {
    [
        vk::Offset3D {
            x: r.x0,
            y: r.y0,
            z: 0,
        },
        vk::Offset3D {
            x: r.x1,
            y: r.y1,
            z: 1,
        },
    ]
}

unsafe fn begin(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<(), FrameError> {
    device
        .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        .vk("reset_command_buffer")?;
    let bi = vk::CommandBufferBeginInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
        ..Default::default()
    };
    device.begin_command_buffer(cmd, &bi).vk("begin_command_buffer")
}

/// Per layer: dispatch the object update, clear, draw the compute output
/// indirectly, then make the result readable by later layers and the blit.
pub(crate) unsafe fn record_layers(
    device: &ash::Device,
    slot: &FrameSlot,
    pipelines: &PipelineSet,
    params: &RecordParams,
) -> Result<(), FrameError> {
    let cmd = slot.layer_cmd;
    begin(device, cmd)?;

    // Previous frame's host writes, blits and feedback reads all complete
    // before this slot touches shared layer images.
    let full = vk::MemoryBarrier {
        s_type: vk::StructureType::MEMORY_BARRIER,
        src_access_mask: vk::AccessFlags::MEMORY_WRITE,
        dst_access_mask: vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
        ..Default::default()
    };
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::ALL_COMMANDS,
        vk::PipelineStageFlags::ALL_COMMANDS,
        vk::DependencyFlags::empty(),
        std::slice::from_ref(&full),
        &[],
        &[],
    );

    let extent = vk::Extent2D {
        width: params.sprite.width,
        height: params.sprite.height,
    };
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    let clear = vk::ClearColorValue {
        float32: params.clear,
    };
    let shared_sets = [slot.sampled_set, slot.uniform_set];

    for (i, layer) in slot.layers.iter().enumerate() {
        // 1) expand objects into vertices
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::COMPUTE, pipelines.compute);
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::COMPUTE,
            params.pipeline_layout,
            SET_SAMPLED,
            &shared_sets,
            &[],
        );
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::COMPUTE,
            params.pipeline_layout,
            SET_STORAGE,
            std::slice::from_ref(&layer.storage_set),
            &[],
        );
        device.cmd_dispatch(cmd, params.object_max, 1, 1);

        let vertices_ready = vk::BufferMemoryBarrier {
            s_type: vk::StructureType::BUFFER_MEMORY_BARRIER,
            src_access_mask: vk::AccessFlags::SHADER_WRITE,
            dst_access_mask: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            buffer: layer.vertices,
            offset: 0,
            size: vk::WHOLE_SIZE,
            ..Default::default()
        };
        // 2) clear; contents from two frames ago are discarded
        let to_clear = image_barrier(
            layer.image,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::GENERAL,
        );
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::PipelineStageFlags::VERTEX_INPUT | vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            std::slice::from_ref(&vertices_ready),
            std::slice::from_ref(&to_clear),
        );
        device.cmd_clear_color_image(
            cmd,
            layer.image,
            vk::ImageLayout::GENERAL,
            &clear,
            std::slice::from_ref(&COLOR_RANGE),
        );
        let to_draw = image_barrier(
            layer.image,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::GENERAL,
        );
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            std::slice::from_ref(&to_draw),
        );

        // 3) draw
        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass: pipelines.render_pass,
            framebuffer: layer.framebuffer,
            render_area: scissor,
            ..Default::default()
        };
        device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
        device.cmd_set_viewport(cmd, 0, std::slice::from_ref(&viewport));
        device.cmd_set_scissor(cmd, 0, std::slice::from_ref(&scissor));
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipelines.graphics[i]);
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            params.pipeline_layout,
            SET_SAMPLED,
            &shared_sets,
            &[],
        );
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            params.pipeline_layout,
            SET_STORAGE,
            std::slice::from_ref(&layer.storage_set),
            &[],
        );
        device.cmd_bind_vertex_buffers(cmd, 0, &[layer.vertices], &[0]);
        device.cmd_draw_indirect(
            cmd,
            slot.indirect,
            DrawCommand::offset_of(i),
            1,
            std::mem::size_of::<DrawCommand>() as u32,
        );
        device.cmd_end_render_pass(cmd);

        // 4) later layers sample it, the composite blits it
        let to_read = image_barrier(
            layer.image,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::TRANSFER_READ,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::GENERAL,
        );
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::COMPUTE_SHADER
                | vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            std::slice::from_ref(&to_read),
        );
    }

    device.end_command_buffer(cmd).vk("end_command_buffer")
}

/// Blits the slot's last layer onto swapchain image `target` and leaves it
/// ready to present.
pub(crate) unsafe fn record_composite(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    slot: &FrameSlot,
    target: vk::Image,
    surface: RenderSize,
    params: &RecordParams,
) -> Result<(), FrameError> {
    let Some(last) = slot.layers.last() else {
        return Ok(());
    };
    begin(device, cmd)?;

    let src_to_transfer = image_barrier(
        last.image,
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::AccessFlags::TRANSFER_READ,
        vk::ImageLayout::GENERAL,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        std::slice::from_ref(&src_to_transfer),
    );
    let to_dst = image_barrier(
        target,
        vk::AccessFlags::empty(),
        vk::AccessFlags::TRANSFER_WRITE,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );
    // Chained to the acquire semaphore wait at COLOR_ATTACHMENT_OUTPUT.
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        std::slice::from_ref(&to_dst),
    );

    let plan = plan_blit(params.sprite, surface, params.linear_blit);
    let layers = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    let region = vk::ImageBlit {
        src_subresource: layers,
        src_offsets: offsets(plan.src),
        dst_subresource: layers,
        dst_offsets: offsets(plan.dst),
    };
    let filter = match plan.filter {
        BlitFilter::Linear => vk::Filter::LINEAR,
        BlitFilter::Nearest => vk::Filter::NEAREST,
    };
    device.cmd_blit_image(
        cmd,
        last.image,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        target,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        std::slice::from_ref(&region),
        filter,
    );

    let src_back = image_barrier(
        last.image,
        vk::AccessFlags::TRANSFER_READ,
        vk::AccessFlags::SHADER_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        vk::ImageLayout::GENERAL,
    );
    let to_present = image_barrier(
        target,
        vk::AccessFlags::TRANSFER_WRITE,
        vk::AccessFlags::empty(),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::PRESENT_SRC_KHR,
    );
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[src_back, to_present],
    );

    device.end_command_buffer(cmd).vk("end_command_buffer")
}

/// Records the layer buffer of every slot, plus one composite per
/// swapchain image. Every slot must be idle.
pub(crate) unsafe fn record_all(
    device: &ash::Device,
    slots: &[FrameSlot],
    pipelines: &PipelineSet,
    swapchain_images: &[vk::Image],
    surface: RenderSize,
    params: &RecordParams,
) -> Result<(), FrameError> {
    for slot in slots {
        record_layers(device, slot, pipelines, params)?;
        for (&cmd, &image) in slot.composite.iter().zip(swapchain_images) {
            record_composite(device, cmd, slot, image, surface, params)?;
        }
    }
    Ok(())
}

// SPDX-License-Identifier: CEPL-1.0
//! Caller-supplied RGBA8 images sampled through set 0 binding 2.
//!
//! An upload creates the image and a host-visible staging buffer, and
//! records the copy into its own command buffer. The copy rides along with
//! the next frame submit; staging is released once that frame's fence
//! signals.
use ash::vk;
use strata_render::{MemoryKind, UploadId};
use tracing::debug;

use crate::error::{FrameError, VkResultExt};
use crate::memory::{
    allocate_command_buffers, create_buffer, create_image_2d, create_image_view, GpuMemoryBlock,
    COLOR_RANGE,
};

pub(crate) const USER_IMAGE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

pub struct UserImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub width: u32,
    pub height: u32,
    block: GpuMemoryBlock,
}

impl UserImage {
    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        self.block.destroy(device);
    }
}

/// Staging side of an upload, alive until its transfer has executed.
pub struct StagedUpload {
    pub id: UploadId,
    pub image_slot: u32,
    pub cmd: vk::CommandBuffer,
    buffer: vk::Buffer,
    block: GpuMemoryBlock,
}

impl StagedUpload {
    pub(crate) unsafe fn destroy(&self, device: &ash::Device, cmd_pool: vk::CommandPool) {
        device.free_command_buffers(cmd_pool, std::slice::from_ref(&self.cmd));
        device.destroy_buffer(self.buffer, None);
        self.block.destroy(device);
    }
}

pub(crate) struct UploadTarget<'a> {
    pub instance: &'a ash::Instance,
    pub device: &'a ash::Device,
    pub phys: vk::PhysicalDevice,
    pub cmd_pool: vk::CommandPool,
}

pub(crate) unsafe fn create_user_image(
    t: &UploadTarget,
    width: u32,
    height: u32,
) -> Result<UserImage, FrameError> {
    let device = t.device;
    let image = create_image_2d(
        device,
        width,
        height,
        USER_IMAGE_FORMAT,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
    )?;
    let req = device.get_image_memory_requirements(image);
    let mut block = match GpuMemoryBlock::allocate(
        t.instance,
        device,
        t.phys,
        "user image",
        req.size,
        MemoryKind::DeviceLocal,
        req.memory_type_bits,
    ) {
        Ok(b) => b,
        Err(e) => {
            device.destroy_image(image, None);
            return Err(e);
        }
    };
    let view = block
        .bind_image(device, image)
        .and_then(|_| create_image_view(device, image, USER_IMAGE_FORMAT));
    match view {
        Ok(view) => Ok(UserImage {
            image,
            view,
            width,
            height,
            block,
        }),
        Err(e) => {
            device.destroy_image(image, None);
            block.destroy(device);
            Err(e)
        }
    }
}

unsafe fn record_copy(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32,
) -> Result<(), FrameError> {
    let bi = vk::CommandBufferBeginInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
        flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        ..Default::default()
    };
    device
        .begin_command_buffer(cmd, &bi)
        .vk("begin_command_buffer")?;

    let to_dst = vk::ImageMemoryBarrier {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
        dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
        old_layout: vk::ImageLayout::UNDEFINED,
        new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: COLOR_RANGE,
        ..Default::default()
    };
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        std::slice::from_ref(&to_dst),
    );

    let copy = vk::BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: 0,
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        },
        image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
        image_extent: vk::Extent3D {
            width,
            height,
            depth: 1,
        },
    };
    device.cmd_copy_buffer_to_image(
        cmd,
        buffer,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        std::slice::from_ref(&copy),
    );

    let to_read = vk::ImageMemoryBarrier {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
        src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
        dst_access_mask: vk::AccessFlags::SHADER_READ,
        old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: COLOR_RANGE,
        ..Default::default()
    };
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        std::slice::from_ref(&to_read),
    );

    device.end_command_buffer(cmd).vk("end_command_buffer")
}

/// Host-visible buffer holding a copy of `rgba`. The command buffer is
/// filled in by the caller.
unsafe fn create_staging(
    t: &UploadTarget,
    id: UploadId,
    image_slot: u32,
    rgba: &[u8],
) -> Result<StagedUpload, FrameError> {
    let device = t.device;
    let buffer = create_buffer(
        device,
        rgba.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    let req = device.get_buffer_memory_requirements(buffer);
    let mut block = match GpuMemoryBlock::allocate(
        t.instance,
        device,
        t.phys,
        "staging",
        req.size,
        MemoryKind::HostVisible,
        req.memory_type_bits,
    ) {
        Ok(b) => b,
        Err(e) => {
            device.destroy_buffer(buffer, None);
            return Err(e);
        }
    };
    let region = match block.bind_buffer(device, buffer) {
        Ok(r) => r,
        Err(e) => {
            device.destroy_buffer(buffer, None);
            block.destroy(device);
            return Err(e);
        }
    };
    if let Some(dst) = block.host_ptr(region) {
        std::ptr::copy_nonoverlapping(rgba.as_ptr(), dst, rgba.len());
    }
    Ok(StagedUpload {
        id,
        image_slot,
        cmd: vk::CommandBuffer::null(),
        buffer,
        block,
    })
}

/// Creates the image and staging for one upload, copies `rgba` into staging
/// and records the transfer. Nothing is submitted here.
pub(crate) unsafe fn stage_upload(
    t: &UploadTarget,
    id: UploadId,
    image_slot: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<(UserImage, StagedUpload), FrameError> {
    let device = t.device;
    let user = create_user_image(t, width, height)?;

    let mut staged = match create_staging(t, id, image_slot, rgba) {
        Ok(s) => s,
        Err(e) => {
            user.destroy(device);
            return Err(e);
        }
    };

    let recorded = allocate_command_buffers(device, t.cmd_pool, 1).and_then(|cmds| {
        staged.cmd = cmds[0];
        record_copy(device, staged.cmd, staged.buffer, user.image, width, height)
    });
    if let Err(e) = recorded {
        staged.destroy(device, t.cmd_pool);
        user.destroy(device);
        return Err(e);
    }

    debug!("upload {id:?}: user image {image_slot} {width}x{height} staged");
    Ok((user, staged))
}

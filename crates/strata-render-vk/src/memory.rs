// SPDX-License-Identifier: CEPL-1.0
//! Coarse device memory blocks with bump sub-allocation.
use ash::vk;
use strata_render::{AllocError, BumpArena, MemoryKind, Region};
use tracing::debug;

use crate::error::{FrameError, VkResultExt};

pub(crate) fn memory_flags(kind: MemoryKind) -> vk::MemoryPropertyFlags {
    match kind {
        MemoryKind::HostVisible => {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        }
        MemoryKind::DeviceLocal => vk::MemoryPropertyFlags::DEVICE_LOCAL,
    }
}

/// First memory type allowed by `type_bits` whose flags contain `req`.
pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    req: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32)).find(|&i| {
        (type_bits & (1 << i)) != 0 && props.memory_types[i as usize].property_flags.contains(req)
    })
}

/// One `vkAllocateMemory` carved up front to back. Host-visible blocks stay
/// mapped for their whole lifetime.
pub struct GpuMemoryBlock {
    memory: vk::DeviceMemory,
    memory_type: u32,
    arena: BumpArena,
    mapped: *mut u8,
}

impl GpuMemoryBlock {
    pub(crate) unsafe fn allocate(
        instance: &ash::Instance,
        device: &ash::Device,
        phys: vk::PhysicalDevice,
        name: &'static str,
        size: vk::DeviceSize,
        kind: MemoryKind,
        type_bits: u32,
    ) -> Result<Self, FrameError> {
        let props = instance.get_physical_device_memory_properties(phys);
        let memory_type = find_memory_type(&props, type_bits, memory_flags(kind))
            .ok_or(AllocError::NoMemoryType { kind, type_bits })?;

        let mai = vk::MemoryAllocateInfo {
            s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
            allocation_size: size.max(1),
            memory_type_index: memory_type,
            ..Default::default()
        };
        let memory = device.allocate_memory(&mai, None).vk("allocate_memory")?;

        let mapped = match kind {
            MemoryKind::HostVisible => {
                match device.map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty()) {
                    Ok(p) => p as *mut u8,
                    Err(e) => {
                        device.free_memory(memory, None);
                        return Err(e).vk("map_memory");
                    }
                }
            }
            MemoryKind::DeviceLocal => std::ptr::null_mut(),
        };

        debug!("block `{name}`: {size} bytes, {kind:?}, type {memory_type}");
        Ok(GpuMemoryBlock {
            memory,
            memory_type,
            arena: BumpArena::new(name, size),
            mapped,
        })
    }

    fn check_type(&self, type_bits: u32) -> Result<(), AllocError> {
        if type_bits & (1 << self.memory_type) == 0 {
            return Err(AllocError::IncompatibleMemoryType {
                block: self.arena.name(),
                memory_type: self.memory_type,
                type_bits,
            });
        }
        Ok(())
    }

    pub(crate) unsafe fn bind_buffer(
        &mut self,
        device: &ash::Device,
        buffer: vk::Buffer,
    ) -> Result<Region, FrameError> {
        let req = device.get_buffer_memory_requirements(buffer);
        self.check_type(req.memory_type_bits)?;
        let region = self.arena.sub_allocate(req.size, req.alignment)?;
        device
            .bind_buffer_memory(buffer, self.memory, region.offset)
            .vk("bind_buffer_memory")?;
        Ok(region)
    }

    pub(crate) unsafe fn bind_image(
        &mut self,
        device: &ash::Device,
        image: vk::Image,
    ) -> Result<Region, FrameError> {
        let req = device.get_image_memory_requirements(image);
        self.check_type(req.memory_type_bits)?;
        let region = self.arena.sub_allocate(req.size, req.alignment)?;
        device
            .bind_image_memory(image, self.memory, region.offset)
            .vk("bind_image_memory")?;
        Ok(region)
    }

    /// CPU address of `region`; `None` for device-local blocks.
    pub(crate) fn host_ptr(&self, region: Region) -> Option<*mut u8> {
        if self.mapped.is_null() || region.end() > self.arena.capacity() {
            return None;
        }
        // SAFETY: region lies inside the mapping.
        Some(unsafe { self.mapped.add(region.offset as usize) })
    }

    pub fn used(&self) -> u64 {
        self.arena.used()
    }

    /// Freeing memory implicitly unmaps it.
    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        device.free_memory(self.memory, None);
    }
}

pub(crate) unsafe fn create_buffer(
    device: &ash::Device,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<vk::Buffer, FrameError> {
    let bci = vk::BufferCreateInfo {
        s_type: vk::StructureType::BUFFER_CREATE_INFO,
        size,
        usage,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        ..Default::default()
    };
    device.create_buffer(&bci, None).vk("create_buffer")
}

pub(crate) unsafe fn create_image_2d(
    device: &ash::Device,
    width: u32,
    height: u32,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> Result<vk::Image, FrameError> {
    let ici = vk::ImageCreateInfo {
        s_type: vk::StructureType::IMAGE_CREATE_INFO,
        image_type: vk::ImageType::TYPE_2D,
        format,
        extent: vk::Extent3D {
            width,
            height,
            depth: 1,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: vk::SampleCountFlags::TYPE_1,
        tiling: vk::ImageTiling::OPTIMAL,
        usage,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        ..Default::default()
    };
    device.create_image(&ici, None).vk("create_image")
}

pub(crate) const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

pub(crate) unsafe fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView, FrameError> {
    let iv_info = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        subresource_range: COLOR_RANGE,
        ..Default::default()
    };
    device.create_image_view(&iv_info, None).vk("create_image_view")
}

pub(crate) unsafe fn allocate_command_buffers(
    device: &ash::Device,
    pool: vk::CommandPool,
    count: u32,
) -> Result<Vec<vk::CommandBuffer>, FrameError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let ai = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: count,
        ..Default::default()
    };
    device.allocate_command_buffers(&ai).vk("allocate_command_buffers")
}

/// Records with `f` into a one-time command buffer, submits and waits.
/// Setup only; never called from the frame loop.
pub(crate) unsafe fn submit_one_shot(
    device: &ash::Device,
    queue: vk::Queue,
    pool: vk::CommandPool,
    f: impl FnOnce(vk::CommandBuffer),
) -> Result<(), FrameError> {
    let cmd = allocate_command_buffers(device, pool, 1)?[0];
    let bi = vk::CommandBufferBeginInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
        flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        ..Default::default()
    };
    let result = (|| {
        device
            .begin_command_buffer(cmd, &bi)
            .vk("begin_command_buffer")?;
        f(cmd);
        device.end_command_buffer(cmd).vk("end_command_buffer")?;
        let si = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            ..Default::default()
        };
        device
            .queue_submit(queue, std::slice::from_ref(&si), vk::Fence::null())
            .vk("queue_submit")?;
        device.queue_wait_idle(queue).vk("queue_wait_idle")
    })();
    device.free_command_buffers(pool, std::slice::from_ref(&cmd));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut p = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (i, f) in types.iter().enumerate() {
            p.memory_types[i].property_flags = *f;
        }
        p
    }

    #[test]
    fn test_find_memory_type_respects_mask_and_flags() {
        let p = props(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let host = memory_flags(MemoryKind::HostVisible);
        assert_eq!(find_memory_type(&p, 0b111, host), Some(2));
        assert_eq!(find_memory_type(&p, 0b011, host), None);
        assert_eq!(
            find_memory_type(&p, 0b111, memory_flags(MemoryKind::DeviceLocal)),
            Some(0)
        );
        assert_eq!(
            find_memory_type(&p, 0b110, memory_flags(MemoryKind::DeviceLocal)),
            None
        );
    }
}

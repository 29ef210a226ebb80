// SPDX-License-Identifier: CEPL-1.0
use ash::khr::{surface, swapchain};
use ash::vk;
use strata_render::RenderSize;
use tracing::{info, warn};

use crate::error::{FrameError, VkResultExt};

/// Swapchain images plus one present semaphore per image. Images are only
/// ever blitted into, so no views are created.
pub struct SwapchainBundle {
    pub swapchain: vk::SwapchainKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub ready: Vec<vk::Semaphore>,
}

fn pm_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}

pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub(crate) fn extent_from_caps(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// Prefers BGRA8 UNORM; blit destinations need a non-sRGB-encoding-agnostic
/// format family, and that one is universally exposed.
pub(crate) fn pick_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM]
        .into_iter()
        .find_map(|want| {
            formats.iter().copied().find(|f| {
                f.format == want && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .or_else(|| formats.first().copied())
}

/// At least one image per frame slot, capped by the surface (0 = no max).
/// The surface's own transform; any other makes every present suboptimal.
pub(crate) fn surface_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    caps.current_transform
}

pub(crate) fn image_count(caps: &vk::SurfaceCapabilitiesKHR, fifo: u32) -> u32 {
    let want = fifo.max(caps.min_image_count);
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

/// `Ok(None)` when the surface currently has no area (minimized).
#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn create_swapchain_bundle(
    device: &ash::Device,
    surf_i: &surface::Instance,
    swap_d: &swapchain::Device,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    old_swapchain: vk::SwapchainKHR,
    hint: RenderSize,
    fifo: u32,
    vsync: bool,
) -> Result<Option<SwapchainBundle>, FrameError> {
    let caps = surf_i
        .get_physical_device_surface_capabilities(phys, surface)
        .vk("get_physical_device_surface_capabilities")?;
    let formats = surf_i
        .get_physical_device_surface_formats(phys, surface)
        .vk("get_physical_device_surface_formats")?;
    let modes = surf_i
        .get_physical_device_surface_present_modes(phys, surface)
        .vk("get_physical_device_surface_present_modes")?;

    let surf_format = pick_surface_format(&formats).ok_or(FrameError::Vulkan {
        call: "get_physical_device_surface_formats",
        result: vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
    })?;
    if !caps
        .supported_usage_flags
        .contains(vk::ImageUsageFlags::TRANSFER_DST)
    {
        warn!("surface does not report TRANSFER_DST usage; composite blit may be rejected");
    }
    let present_mode = choose_present_mode(&modes, vsync);
    let extent = extent_from_caps(&caps, hint);
    if extent.width == 0 || extent.height == 0 {
        return Ok(None);
    }
    let min_count = image_count(&caps, fifo);

    let pre_transform = surface_transform(&caps);

    // Images are composited by blit, so TRANSFER_DST is the usage that matters.
    let swap_info = vk::SwapchainCreateInfoKHR {
        s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
        surface,
        min_image_count: min_count,
        image_format: surf_format.format,
        image_color_space: surf_format.color_space,
        image_extent: extent,
        image_array_layers: 1,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
        image_sharing_mode: vk::SharingMode::EXCLUSIVE,
        pre_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode,
        clipped: vk::TRUE,
        old_swapchain,
        ..Default::default()
    };

    let new_swapchain = swap_d
        .create_swapchain(&swap_info, None)
        .vk("create_swapchain")?;
    let images = match swap_d.get_swapchain_images(new_swapchain) {
        Ok(images) => images,
        Err(e) => {
            swap_d.destroy_swapchain(new_swapchain, None);
            return Err(e).vk("get_swapchain_images");
        }
    };

    let sem_ci = vk::SemaphoreCreateInfo::default();
    let mut ready = Vec::with_capacity(images.len());
    for _ in 0..images.len() {
        match device.create_semaphore(&sem_ci, None) {
            Ok(s) => ready.push(s),
            Err(e) => {
                for &s in &ready {
                    device.destroy_semaphore(s, None);
                }
                swap_d.destroy_swapchain(new_swapchain, None);
                return Err(e).vk("create_semaphore");
            }
        }
    }

    info!(
        "swapchain: {:?}, present_mode: {}, extent: {}x{}, images(min={} → asked={} → got={})",
        surf_format.format,
        pm_name(present_mode),
        extent.width,
        extent.height,
        caps.min_image_count,
        min_count,
        images.len()
    );

    Ok(Some(SwapchainBundle {
        swapchain: new_swapchain,
        extent,
        images,
        ready,
    }))
}

impl SwapchainBundle {
    pub fn size(&self) -> RenderSize {
        RenderSize {
            width: self.extent.width,
            height: self.extent.height,
        }
    }

    pub(crate) unsafe fn destroy(&self, device: &ash::Device, swap_d: &swapchain::Device) {
        for &s in &self.ready {
            device.destroy_semaphore(s, None);
        }
        swap_d.destroy_swapchain(self.swapchain, None);
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;

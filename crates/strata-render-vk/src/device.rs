// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, CStr};

#[cfg(debug_assertions)]
use ash::ext::debug_utils as ext_debug;
use ash::khr::{surface, swapchain};
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use strata_render::DeviceLimits;
use tracing::{debug, error, info, warn};

use crate::error::{FrameError, VkResultExt};

#[cfg(debug_assertions)]
pub(crate) type DebugState = vk::DebugUtilsMessengerEXT;
#[cfg(not(debug_assertions))]
pub(crate) type DebugState = ();

const APP_NAME: &CStr = c"strata";
#[cfg(debug_assertions)]
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// What the renderer learned about the picked device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub api_version: u32,
    pub queue_family: u32,
    pub limits: DeviceLimits,
}

#[cfg(debug_assertions)]
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let msg = CStr::from_ptr((*data).p_message).to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[vulkan] {msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[vulkan] {msg}");
    } else {
        debug!("[vulkan] {msg}");
    }
    vk::FALSE
}

#[cfg(debug_assertions)]
unsafe fn create_debug_messenger(entry: &Entry, instance: &Instance) -> Result<DebugState, FrameError> {
    let loader = ext_debug::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    };
    loader
        .create_debug_utils_messenger(&ci, None)
        .vk("create_debug_utils_messenger")
}

#[cfg(not(debug_assertions))]
unsafe fn create_debug_messenger(
    _entry: &Entry,
    _instance: &Instance,
) -> Result<DebugState, FrameError> {
    Ok(())
}

#[cfg(debug_assertions)]
pub(crate) unsafe fn destroy_debug_messenger(entry: &Entry, instance: &Instance, dbg: DebugState) {
    let loader = ext_debug::Instance::new(entry, instance);
    loader.destroy_debug_utils_messenger(dbg, None);
}

#[cfg(not(debug_assertions))]
pub(crate) unsafe fn destroy_debug_messenger(_entry: &Entry, _instance: &Instance, _dbg: DebugState) {
    // no-op
}

unsafe fn create_instance(entry: &Entry, display_raw: RawDisplayHandle) -> Result<Instance, FrameError> {
    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: APP_NAME.as_ptr(),
        application_version: 0,
        p_engine_name: APP_NAME.as_ptr(),
        engine_version: 0,
        api_version: vk::API_VERSION_1_1,
        ..Default::default()
    };

    let ext_slice = ash_window::enumerate_required_extensions(display_raw)
        .vk("enumerate_required_extensions")?;
    #[allow(unused_mut)]
    let mut ext_vec: Vec<*const c_char> = ext_slice.to_vec();

    #[allow(unused_mut)]
    let mut layers: Vec<*const c_char> = Vec::new();

    #[cfg(debug_assertions)]
    {
        ext_vec.push(ext_debug::NAME.as_ptr());
        let available = entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default();
        let has_validation = available
            .iter()
            .any(|l| CStr::from_ptr(l.layer_name.as_ptr()) == VALIDATION_LAYER);
        if has_validation {
            layers.push(VALIDATION_LAYER.as_ptr());
        } else {
            warn!("validation layer not installed, running without it");
        }
    }

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_application_info: &app_info,
        enabled_extension_count: ext_vec.len() as u32,
        pp_enabled_extension_names: ext_vec.as_ptr(),
        enabled_layer_count: layers.len() as u32,
        pp_enabled_layer_names: layers.as_ptr(),
        ..Default::default()
    };

    entry
        .create_instance(&create_info, None)
        .vk("create_instance")
}

pub(crate) fn raw_handles(
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
) -> Result<(RawDisplayHandle, raw_window_handle::RawWindowHandle), FrameError> {
    let dh = display
        .display_handle()
        .map_err(|e| FrameError::Window(e.to_string()))?
        .as_raw();
    let wh = window
        .window_handle()
        .map_err(|e| FrameError::Window(e.to_string()))?
        .as_raw();
    Ok((dh, wh))
}

pub(crate) unsafe fn create_surface(
    entry: &Entry,
    instance: &Instance,
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
) -> Result<vk::SurfaceKHR, FrameError> {
    let (dh, wh) = raw_handles(window, display)?;
    ash_window::create_surface(entry, instance, dh, wh, None).vk("ash_window::create_surface")
}

pub(crate) struct InstanceBundle {
    pub entry: Entry,
    pub instance: Instance,
    pub surface_loader: surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub debug: DebugState,
}

pub(crate) unsafe fn init_instance_and_surface(
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
) -> Result<InstanceBundle, FrameError> {
    // STRICT ORDER:
    // 1) Create VkInstance (platform WSI + debug ext)
    // 2) Create VkSurfaceKHR FROM THIS INSTANCE
    // 3) Pick physical device/queue AGAINST THIS SURFACE (present support)
    // 4) Create VkDevice for the picked queue family
    let (dh, _) = raw_handles(window, display)?;

    let entry = Entry::linked();
    let instance = create_instance(&entry, dh)?;
    let surface_loader = surface::Instance::new(&entry, &instance);
    let surface = match create_surface(&entry, &instance, window, display) {
        Ok(s) => s,
        Err(e) => {
            instance.destroy_instance(None);
            return Err(e);
        }
    };
    let debug = match create_debug_messenger(&entry, &instance) {
        Ok(d) => d,
        Err(e) => {
            surface_loader.destroy_surface(surface, None);
            instance.destroy_instance(None);
            return Err(e);
        }
    };

    Ok(InstanceBundle {
        entry,
        instance,
        surface_loader,
        surface,
        debug,
    })
}

/// First queue family doing graphics and compute that can present to `surface`.
pub(crate) unsafe fn pick_device_and_queue(
    instance: &Instance,
    surf_i: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, u32), FrameError> {
    let wanted = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE;
    let mut fallback = None;

    for phys in instance
        .enumerate_physical_devices()
        .vk("enumerate_physical_devices")?
    {
        let props = instance.get_physical_device_properties(phys);
        let qprops = instance.get_physical_device_queue_family_properties(phys);

        for (i, q) in qprops.iter().enumerate() {
            if q.queue_flags.contains(wanted)
                && surf_i
                    .get_physical_device_surface_support(phys, i as u32, surface)
                    .unwrap_or(false)
            {
                if props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                    return Ok((phys, i as u32));
                }
                fallback.get_or_insert((phys, i as u32));
                break;
            }
        }
    }
    fallback.ok_or(FrameError::NoDevice)
}

pub(crate) unsafe fn query_device_info(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    queue_family: u32,
) -> DeviceInfo {
    let props = instance.get_physical_device_properties(phys);
    let name = CStr::from_ptr(props.device_name.as_ptr())
        .to_string_lossy()
        .into_owned();
    let fmt = instance.get_physical_device_format_properties(phys, vk::Format::R8G8B8A8_UNORM);
    let linear_blit = fmt
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR);

    let l = &props.limits;
    DeviceInfo {
        name,
        api_version: props.api_version,
        queue_family,
        limits: DeviceLimits {
            max_compute_work_group_count_x: l.max_compute_work_group_count[0],
            max_image_dimension_2d: l.max_image_dimension2_d,
            min_storage_buffer_offset_alignment: l.min_storage_buffer_offset_alignment,
            min_uniform_buffer_offset_alignment: l.min_uniform_buffer_offset_alignment,
            linear_blit,
        },
    }
}

pub(crate) fn log_device_info(info: &DeviceInfo) {
    info!(
        "device: {} (api {}.{}.{}), queue family {}",
        info.name,
        vk::api_version_major(info.api_version),
        vk::api_version_minor(info.api_version),
        vk::api_version_patch(info.api_version),
        info.queue_family
    );
    info!(
        "limits: dispatch_x={} image_2d={} storage_align={} uniform_align={} linear_blit={}",
        info.limits.max_compute_work_group_count_x,
        info.limits.max_image_dimension_2d,
        info.limits.min_storage_buffer_offset_alignment,
        info.limits.min_uniform_buffer_offset_alignment,
        info.limits.linear_blit
    );
}

pub(crate) unsafe fn create_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    queue_family: u32,
) -> Result<(ash::Device, vk::Queue), FrameError> {
    let priorities = [1.0_f32];
    let qinfo = vk::DeviceQueueCreateInfo {
        s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
        queue_family_index: queue_family,
        queue_count: 1,
        p_queue_priorities: priorities.as_ptr(),
        ..Default::default()
    };

    let device_exts: [*const c_char; 1] = [swapchain::NAME.as_ptr()];

    let dinfo = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: 1,
        p_queue_create_infos: &qinfo,
        enabled_extension_count: device_exts.len() as u32,
        pp_enabled_extension_names: device_exts.as_ptr(),
        ..Default::default()
    };

    let device = instance
        .create_device(phys, &dinfo, None)
        .vk("create_device")?;
    let queue = device.get_device_queue(queue_family, 0);
    Ok((device, queue))
}

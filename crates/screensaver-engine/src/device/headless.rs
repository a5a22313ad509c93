//! Surface-less device, used by tests and offline rendering.

use anyhow::{Context, Result};

use super::gpu::{create_instance, request_device};

/// A device/queue pair with no window attached.
pub struct HeadlessGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    /// Requests any adapter, falling back to a software adapter.
    pub async fn new() -> Result<Self> {
        let instance = create_instance();

        let mut adapter = None;
        for force_fallback_adapter in [false, true] {
            match instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::LowPower,
                    compatible_surface: None,
                    force_fallback_adapter,
                })
                .await
            {
                Ok(a) => {
                    adapter = Some(a);
                    break;
                }
                Err(e) => log::debug!("headless adapter request (fallback={force_fallback_adapter}) failed: {e}"),
            }
        }
        let adapter = adapter.context("no GPU adapter available for headless rendering")?;

        let (device, queue) = request_device(&adapter, "screensaver headless device").await?;
        Ok(Self { device, queue })
    }

    /// Blocking variant of [`HeadlessGpu::new`] that logs and returns `None`
    /// on machines without any adapter.
    pub fn try_new() -> Option<Self> {
        match pollster::block_on(Self::new()) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                log::warn!("headless GPU unavailable: {e:#}");
                None
            }
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

// ============================================================
// Layer 5 — Backends
// ============================================================
// Training needs autodiff; evaluation runs on the inner backend
// via `model.valid()`.
//
//   cpu — NdArray, always available
//   gpu — Wgpu (Vulkan / Metal / DX12 / WebGPU)

use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};

pub type CpuBackend = Autodiff<NdArray>;
pub type GpuBackend = Autodiff<Wgpu>;

pub fn cpu_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

pub fn gpu_device() -> WgpuDevice {
    WgpuDevice::default()
}

//! Dispatch façade: request in, cached handle out.
//!
//! [`KernelLibrary`] is an explicitly constructed context owning one
//! registry and one generator; embedders create as many independent
//! libraries as they need. Dispatch is stateless per call and its only
//! error channel is `None` — invalid shapes and failed generations
//! both land there, with the detail on the debug log.

use crate::descriptor::{
    encode_binary, encode_gemm, encode_ternary, encode_unary, BinaryRequest, GemmRequest,
    TernaryRequest, UnaryRequest,
};
use crate::eltwise::{BinaryKernel, TernaryKernel, UnaryKernel};
use crate::gemm::GemmKernel;
use crate::generator::{KernelGenerator, KernelHandle, ReferenceGenerator};
use crate::registry::{KernelRegistry, RegistryInfo};

pub struct KernelLibrary {
    registry: KernelRegistry,
    generator: Box<dyn KernelGenerator>,
}

impl KernelLibrary {
    /// Library backed by the reference generator.
    pub fn new() -> Self {
        Self::with_generator(Box::new(ReferenceGenerator::new()))
    }

    /// Library backed by a custom generator.
    pub fn with_generator(generator: Box<dyn KernelGenerator>) -> Self {
        KernelLibrary {
            registry: KernelRegistry::new(),
            generator,
        }
    }

    /// Dispatch a unary kernel for `req`.
    ///
    /// Returns `None` when the shape is invalid or the generator cannot
    /// serve the request; nothing is partially dispatched.
    pub fn dispatch_unary(&self, req: &UnaryRequest) -> Option<UnaryKernel> {
        if !req.is_valid() {
            log::debug!("rejecting unary request with invalid shape: {req:?}");
            return None;
        }
        let desc = encode_unary(req);
        match self
            .registry
            .lookup_or_create(&desc, || self.generator.generate(&desc))
        {
            Ok(entry) => match &entry.kernel {
                KernelHandle::Unary(k) => Some(k.clone()),
                _ => None,
            },
            Err(err) => {
                log::debug!("unary generation failed: {err}");
                None
            }
        }
    }

    pub fn dispatch_binary(&self, req: &BinaryRequest) -> Option<BinaryKernel> {
        if !req.is_valid() {
            log::debug!("rejecting binary request with invalid shape: {req:?}");
            return None;
        }
        let desc = encode_binary(req);
        match self
            .registry
            .lookup_or_create(&desc, || self.generator.generate(&desc))
        {
            Ok(entry) => match &entry.kernel {
                KernelHandle::Binary(k) => Some(k.clone()),
                _ => None,
            },
            Err(err) => {
                log::debug!("binary generation failed: {err}");
                None
            }
        }
    }

    pub fn dispatch_ternary(&self, req: &TernaryRequest) -> Option<TernaryKernel> {
        if !req.is_valid() {
            log::debug!("rejecting ternary request with invalid shape: {req:?}");
            return None;
        }
        let desc = encode_ternary(req);
        match self
            .registry
            .lookup_or_create(&desc, || self.generator.generate(&desc))
        {
            Ok(entry) => match &entry.kernel {
                KernelHandle::Ternary(k) => Some(k.clone()),
                _ => None,
            },
            Err(err) => {
                log::debug!("ternary generation failed: {err}");
                None
            }
        }
    }

    pub fn dispatch_gemm(&self, req: &GemmRequest) -> Option<GemmKernel> {
        if !req.is_valid() {
            log::debug!("rejecting gemm request with invalid shape: {req:?}");
            return None;
        }
        let desc = encode_gemm(req);
        match self
            .registry
            .lookup_or_create(&desc, || self.generator.generate(&desc))
        {
            Ok(entry) => match &entry.kernel {
                KernelHandle::Gemm(k) => Some(k.clone()),
                _ => None,
            },
            Err(err) => {
                log::debug!("gemm generation failed: {err}");
                None
            }
        }
    }

    /// The underlying registry, for pre-seeding and diagnostics.
    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    pub fn info(&self) -> RegistryInfo {
        self.registry.info()
    }
}

impl Default for KernelLibrary {
    fn default() -> Self {
        Self::new()
    }
}

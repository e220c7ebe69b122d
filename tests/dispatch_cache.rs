//! Registry and dispatch behavior under a counting mock generator:
//! materialize-once, concurrent races, failure policy and static
//! pre-seeding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tpp_kernels::{
    Datatype, Descriptor, GenerateError, GeneratedKernel, KernelGenerator, KernelHandle,
    KernelLibrary, UnaryFlags, UnaryKernel, UnaryKind, UnaryRequest,
};

struct MockGenerator {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    fail: bool,
}

impl MockGenerator {
    fn counting(calls: Arc<AtomicUsize>) -> Self {
        MockGenerator {
            calls,
            delay: Duration::ZERO,
            fail: false,
        }
    }
}

impl KernelGenerator for MockGenerator {
    fn generate(&self, _desc: &Descriptor) -> Result<GeneratedKernel, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail {
            return Err(GenerateError::Unsupported("mock failure".into()));
        }
        Ok(GeneratedKernel {
            kernel: KernelHandle::Unary(UnaryKernel::new(|_| {})),
            code_size: 64,
            flops: 0,
        })
    }
}

fn request(m: u32) -> UnaryRequest {
    UnaryRequest {
        m,
        n: 1,
        ldi: m,
        ldo: m,
        in_type: Datatype::F32,
        comp_type: Datatype::F32,
        out_type: Datatype::F32,
        flags: UnaryFlags::default(),
        kind: UnaryKind::Identity,
    }
}

#[test]
fn identical_requests_generate_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator::counting(calls.clone())));

    for _ in 0..5 {
        assert!(lib.dispatch_unary(&request(32)).is_some());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let info = lib.info();
    assert_eq!(info.entries, 1);
    assert_eq!(info.misses, 1);
    assert_eq!(info.hits, 4);
    assert_eq!(info.code_bytes, 64);
}

#[test]
fn distinct_shapes_generate_separately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator::counting(calls.clone())));

    assert!(lib.dispatch_unary(&request(32)).is_some());
    assert!(lib.dispatch_unary(&request(33)).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(lib.info().entries, 2);
}

#[test]
fn concurrent_dispatch_of_new_signature_generates_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = Arc::new(KernelLibrary::with_generator(Box::new(MockGenerator {
        calls: calls.clone(),
        delay: Duration::from_millis(50),
        fail: false,
    })));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let lib = Arc::clone(&lib);
            thread::spawn(move || lib.dispatch_unary(&request(64)).is_some())
        })
        .collect();
    for t in threads {
        assert!(t.join().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(lib.info().entries, 1);
}

#[test]
fn failed_generation_is_retried_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator {
        calls: calls.clone(),
        delay: Duration::ZERO,
        fail: true,
    }));

    assert!(lib.dispatch_unary(&request(16)).is_none());
    assert!(lib.dispatch_unary(&request(16)).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(lib.info().entries, 0);
}

#[test]
fn static_entry_short_circuits_the_generator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator::counting(calls.clone())));

    let req = request(128);
    let desc = tpp_kernels::descriptor::encode_unary(&req);
    lib.registry().register_static(
        &desc,
        KernelHandle::Unary(UnaryKernel::new(|_| {})),
        256,
        0,
    );

    assert!(lib.dispatch_unary(&req).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let info = lib.info();
    assert_eq!(info.static_entries, 1);
    assert_eq!(info.generated_entries, 0);
    assert_eq!(info.code_bytes, 256);
}

#[test]
fn clear_forces_regeneration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator::counting(calls.clone())));

    let kernel = lib.dispatch_unary(&request(32)).unwrap();
    lib.registry().clear();
    assert!(lib.dispatch_unary(&request(32)).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The pre-clear handle is still callable.
    let param = tpp_kernels::UnaryParam::default();
    unsafe { kernel.call(&param) };
}

#[test]
fn invalid_requests_never_reach_the_generator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let lib = KernelLibrary::with_generator(Box::new(MockGenerator::counting(calls.clone())));

    let mut zero_extent = request(0);
    zero_extent.ldi = 1;
    zero_extent.ldo = 1;
    assert!(lib.dispatch_unary(&zero_extent).is_none());

    let mut short_ld = request(32);
    short_ld.ldo = 16;
    assert!(lib.dispatch_unary(&short_ld).is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lib.info().misses, 0);
}

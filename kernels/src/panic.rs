unsafe extern "C" {
    fn __nvvm_trap() -> !;
}

// A panicking work item aborts the whole launch; the host sees it as a failed stream.
#[panic_handler]
fn on_device_panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { __nvvm_trap() }
}

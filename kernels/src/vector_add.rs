#[cuda_std::kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn vector_add(
    // input
    source_a_ptr: *const i32,
    source_b_ptr: *const i32,
    // output
    dest_ptr: *mut i32,
) {
    // The host sizes the grid to exactly one thread per element.
    let idx = cuda_std::thread::index() as usize;

    unsafe {
        *dest_ptr.add(idx) = logic::add_values(*source_a_ptr.add(idx), *source_b_ptr.add(idx));
    }
}

#[cuda_std::kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn vector_add_single_work_item(
    // input
    source_a_ptr: *const i32,
    source_b_ptr: *const i32,
    // output
    dest_ptr: *mut i32,
    // element count
    count: i32,
) {
    let count = count as usize;
    let source_a = unsafe { core::slice::from_raw_parts(source_a_ptr, count) };
    let source_b = unsafe { core::slice::from_raw_parts(source_b_ptr, count) };
    let dest = unsafe { core::slice::from_raw_parts_mut(dest_ptr, count) };

    logic::add_single_work_item(source_a, source_b, dest, count);
}

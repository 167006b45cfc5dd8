use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// How a kernel may access a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    ReadOnly,
    ReadWrite,
}

impl MemAccess {
    pub fn is_writable(&self) -> bool {
        matches!(self, MemAccess::ReadWrite)
    }
}

/// Which addition kernel to launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KernelVariant {
    /// One work item per element.
    #[default]
    PerElement,
    /// A single work item loops over all elements; takes the element count as an extra argument.
    SingleWorkItem,
}

/// Kind of a declared kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Buffer,
    Int,
}

const PER_ELEMENT_PARAMS: &[ParamKind] = &[ParamKind::Buffer, ParamKind::Buffer, ParamKind::Buffer];
const SINGLE_WORK_ITEM_PARAMS: &[ParamKind] = &[
    ParamKind::Buffer,
    ParamKind::Buffer,
    ParamKind::Buffer,
    ParamKind::Int,
];

impl KernelVariant {
    pub const ALL: [KernelVariant; 2] = [KernelVariant::PerElement, KernelVariant::SingleWorkItem];

    /// Name of the entry point in the compiled kernel module.
    pub fn kernel_name(&self) -> &'static str {
        match self {
            KernelVariant::PerElement => kernels::VECTOR_ADD,
            KernelVariant::SingleWorkItem => kernels::VECTOR_ADD_SINGLE_WORK_ITEM,
        }
    }

    /// Declared parameters, in argument index order.
    pub fn params(&self) -> &'static [ParamKind] {
        match self {
            KernelVariant::PerElement => PER_ELEMENT_PARAMS,
            KernelVariant::SingleWorkItem => SINGLE_WORK_ITEM_PARAMS,
        }
    }
}

impl fmt::Display for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelVariant::PerElement => write!(f, "per-element"),
            KernelVariant::SingleWorkItem => write!(f, "single-work-item"),
        }
    }
}

impl FromStr for KernelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-element" | "ndrange" => Ok(KernelVariant::PerElement),
            "single-work-item" | "task" => Ok(KernelVariant::SingleWorkItem),
            other => Err(format!(
                "unknown kernel variant '{}' (expected 'per-element' or 'single-work-item')",
                other
            )),
        }
    }
}

/// A value bound to one kernel parameter.
pub enum KernelArg<'a, B> {
    Buffer(&'a B),
    Int(i32),
}

impl<B> KernelArg<'_, B> {
    pub fn kind(&self) -> ParamKind {
        match self {
            KernelArg::Buffer(_) => ParamKind::Buffer,
            KernelArg::Int(_) => ParamKind::Int,
        }
    }
}

impl<B> Clone for KernelArg<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for KernelArg<'_, B> {}

/// A kernel plus the arguments bound to it, built fresh for each launch.
pub struct KernelInvocation<'a, B> {
    variant: KernelVariant,
    args: Vec<Option<KernelArg<'a, B>>>,
}

/// The arguments of a fully bound invocation, destructured per variant.
pub enum BoundKernel<'a, B> {
    PerElement {
        source_a: &'a B,
        source_b: &'a B,
        dest: &'a B,
    },
    SingleWorkItem {
        source_a: &'a B,
        source_b: &'a B,
        dest: &'a B,
        count: i32,
    },
}

impl<'a, B> KernelInvocation<'a, B> {
    pub fn new(variant: KernelVariant) -> Self {
        Self {
            variant,
            args: vec![None; variant.params().len()],
        }
    }

    pub fn variant(&self) -> KernelVariant {
        self.variant
    }

    /// Bind `arg` to parameter `index`; rejects indices and kinds the kernel does not declare.
    pub fn set_arg(&mut self, index: usize, arg: KernelArg<'a, B>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let params = self.variant.params();
        let expected = params.get(index).ok_or_else(|| {
            format!(
                "kernel {} has {} parameters, cannot bind argument {}",
                self.variant.kernel_name(),
                params.len(),
                index
            )
        })?;
        if *expected != arg.kind() {
            return Err(format!(
                "kernel {} parameter {} expects {:?}, got {:?}",
                self.variant.kernel_name(),
                index,
                expected,
                arg.kind()
            )
            .into());
        }
        self.args[index] = Some(arg);
        Ok(())
    }

    /// Check every parameter is bound and hand back the arguments by role.
    pub fn bind(&self) -> Result<BoundKernel<'a, B>, Box<dyn Error + Send + Sync>> {
        let mut bound = Vec::with_capacity(self.args.len());
        for (index, arg) in self.args.iter().enumerate() {
            let arg = (*arg).ok_or_else(|| {
                format!("kernel {} argument {} is not set", self.variant.kernel_name(), index)
            })?;
            bound.push(arg);
        }

        match (self.variant, bound.as_slice()) {
            (
                KernelVariant::PerElement,
                &[KernelArg::Buffer(source_a), KernelArg::Buffer(source_b), KernelArg::Buffer(dest)],
            ) => Ok(BoundKernel::PerElement {
                source_a,
                source_b,
                dest,
            }),
            (
                KernelVariant::SingleWorkItem,
                &[
                    KernelArg::Buffer(source_a),
                    KernelArg::Buffer(source_b),
                    KernelArg::Buffer(dest),
                    KernelArg::Int(count),
                ],
            ) => Ok(BoundKernel::SingleWorkItem {
                source_a,
                source_b,
                dest,
                count,
            }),
            _ => Err(format!(
                "arguments do not match the signature of kernel {}",
                self.variant.kernel_name()
            )
            .into()),
        }
    }
}

/// Check the buffers of a bound kernel can hold the elements it touches.
///
/// `len_of` and `access_of` describe a backend's buffer handle. Returns the number of
/// elements the kernel processes.
pub fn check_kernel_extent<B>(
    kernel: &BoundKernel<'_, B>,
    len_of: impl Fn(&B) -> usize,
    access_of: impl Fn(&B) -> MemAccess,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let (source_a, source_b, dest, count) = match kernel {
        BoundKernel::PerElement { source_a, source_b, dest } => (*source_a, *source_b, *dest, len_of(*dest)),
        BoundKernel::SingleWorkItem { source_a, source_b, dest, count } => {
            let count = usize::try_from(*count).map_err(|_| format!("invalid element count {}", count))?;
            (*source_a, *source_b, *dest, count)
        }
    };

    if !access_of(dest).is_writable() {
        return Err("kernel output buffer is read-only".into());
    }
    for (name, buffer) in [("source A", source_a), ("source B", source_b), ("destination", dest)] {
        if len_of(buffer) < count {
            return Err(format!(
                "{} buffer holds {} elements, kernel needs {}",
                name,
                len_of(buffer),
                count
            )
            .into());
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeBuffer {
        len: usize,
        access: MemAccess,
    }

    fn buffer(len: usize, access: MemAccess) -> FakeBuffer {
        FakeBuffer { len, access }
    }

    #[test]
    fn test_variant_parses_from_cli_spelling() {
        assert_eq!("per-element".parse::<KernelVariant>().unwrap(), KernelVariant::PerElement);
        assert_eq!(
            "Single-Work-Item".parse::<KernelVariant>().unwrap(),
            KernelVariant::SingleWorkItem
        );
        assert!("both".parse::<KernelVariant>().is_err());
        for variant in KernelVariant::ALL {
            assert_eq!(variant.to_string().parse::<KernelVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn test_kernel_names() {
        assert_eq!(KernelVariant::PerElement.kernel_name(), "vector_add");
        assert_eq!(KernelVariant::SingleWorkItem.kernel_name(), "vector_add_single_work_item");
    }

    #[test]
    fn test_bind_per_element() {
        let a = buffer(20, MemAccess::ReadOnly);
        let b = buffer(20, MemAccess::ReadOnly);
        let c = buffer(20, MemAccess::ReadWrite);

        let mut invocation = KernelInvocation::new(KernelVariant::PerElement);
        invocation.set_arg(2, KernelArg::Buffer(&c)).unwrap();
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&b)).unwrap();

        let bound = invocation.bind().unwrap();
        let count = check_kernel_extent(&bound, |b| b.len, |b| b.access).unwrap();
        assert_eq!(count, 20);
        assert!(matches!(bound, BoundKernel::PerElement { dest, .. } if std::ptr::eq(dest, &c)));
    }

    #[test]
    fn test_bind_single_work_item_requires_count() {
        let a = buffer(20, MemAccess::ReadOnly);
        let b = buffer(20, MemAccess::ReadOnly);
        let c = buffer(20, MemAccess::ReadWrite);

        let mut invocation = KernelInvocation::new(KernelVariant::SingleWorkItem);
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&b)).unwrap();
        invocation.set_arg(2, KernelArg::Buffer(&c)).unwrap();
        assert!(invocation.bind().is_err());

        invocation.set_arg(3, KernelArg::Int(20)).unwrap();
        let bound = invocation.bind().unwrap();
        assert!(matches!(bound, BoundKernel::SingleWorkItem { count: 20, .. }));
    }

    #[test]
    fn test_set_arg_rejects_mismatched_bindings() {
        let a = buffer(20, MemAccess::ReadOnly);

        let mut per_element = KernelInvocation::<FakeBuffer>::new(KernelVariant::PerElement);
        assert!(per_element.set_arg(3, KernelArg::Int(20)).is_err());
        assert!(per_element.set_arg(0, KernelArg::Int(20)).is_err());

        let mut single = KernelInvocation::new(KernelVariant::SingleWorkItem);
        assert!(single.set_arg(3, KernelArg::Buffer(&a)).is_err());
    }

    #[test]
    fn test_extent_rejects_read_only_output_and_short_buffers() {
        let a = buffer(20, MemAccess::ReadOnly);
        let short = buffer(10, MemAccess::ReadOnly);
        let read_only_dest = buffer(20, MemAccess::ReadOnly);
        let dest = buffer(20, MemAccess::ReadWrite);

        let mut invocation = KernelInvocation::new(KernelVariant::PerElement);
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(2, KernelArg::Buffer(&read_only_dest)).unwrap();
        let bound = invocation.bind().unwrap();
        assert!(check_kernel_extent(&bound, |b| b.len, |b| b.access).is_err());

        let mut invocation = KernelInvocation::new(KernelVariant::SingleWorkItem);
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&short)).unwrap();
        invocation.set_arg(2, KernelArg::Buffer(&dest)).unwrap();
        invocation.set_arg(3, KernelArg::Int(20)).unwrap();
        let bound = invocation.bind().unwrap();
        assert!(check_kernel_extent(&bound, |b| b.len, |b| b.access).is_err());

        invocation.set_arg(3, KernelArg::Int(-1)).unwrap();
        let bound = invocation.bind().unwrap();
        assert!(check_kernel_extent(&bound, |b| b.len, |b| b.access).is_err());
    }
}

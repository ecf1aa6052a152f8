use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// Owning handle to a heap value whose type is only known where it was created.
///
/// The concrete type is forgotten at construction and remembered only by the
/// deleter, so the handle can sit inside a non-generic [`Task`](crate::Task).
pub(crate) struct ErasedBox {
    ptr: NonNull<()>,
    drop: unsafe fn(NonNull<()>),
    type_name: &'static str,
}

impl ErasedBox {
    pub(crate) fn new<T>(value: T) -> Self {
        let ptr = NonNull::from(Box::leak(Box::new(value))).cast();

        Self {
            ptr,
            drop: drop_boxed::<T>,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Moves the value back out, releasing the allocation.
    ///
    /// # Safety
    ///
    /// `T` must be the type this box was created with.
    pub(crate) unsafe fn into_inner<T>(self) -> T {
        debug_assert_eq!(
            self.type_name,
            std::any::type_name::<T>(),
            "ErasedBox read back as the wrong type"
        );

        let this = ManuallyDrop::new(self);
        let boxed = Box::from_raw(this.ptr.cast::<T>().as_ptr());

        *boxed
    }
}

impl Drop for ErasedBox {
    fn drop(&mut self) {
        unsafe { (self.drop)(self.ptr) }
    }
}

unsafe fn drop_boxed<T>(ptr: NonNull<()>) {
    drop(Box::from_raw(ptr.cast::<T>().as_ptr()));
}

#![warn(unused_imports)]

use core::cell::{RefCell, RefMut};
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::hardware::Port;

/// 中断安全的FreeCell
///
/// 借用期间关中断，释放借用后恢复进入前的中断状态。
/// 单核上这就足以保护线程与中断共享的数据。
///
/// 使用示例
///
/// static DATA: RTIntrFreeCell<u32, CortexM4> = unsafe { RTIntrFreeCell::new(0) };
///
/// let mut data = DATA.exclusive_access();
/// *data += 1;
pub struct RTIntrFreeCell<T, P: Port> {
    inner: RefCell<T>,
    _port: PhantomData<P>,
}

// 所有访问都在关中断下进行
unsafe impl<T, P: Port> Sync for RTIntrFreeCell<T, P> {}

pub struct RTIntrRefMut<'a, T, P: Port> {
    inner: ManuallyDrop<RefMut<'a, T>>,
    level: P::Level,
}

impl<T, P: Port> RTIntrFreeCell<T, P> {
    /// # Safety
    /// 只能用于单核，且数据不能在多个核之间共享。
    pub const unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
            _port: PhantomData,
        }
    }

    /// Panic if the data has been borrowed.
    pub fn exclusive_access(&self) -> RTIntrRefMut<'_, T, P> {
        let level = P::interrupt_disable();
        RTIntrRefMut {
            inner: ManuallyDrop::new(self.inner.borrow_mut()),
            level,
        }
    }

    pub fn exclusive_session<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&mut T) -> V,
    {
        let mut inner = self.exclusive_access();
        f(inner.deref_mut())
    }
}

impl<T, P: Port> Drop for RTIntrRefMut<'_, T, P> {
    fn drop(&mut self) {
        // 先归还借用，再开中断
        unsafe { ManuallyDrop::drop(&mut self.inner) };
        P::interrupt_enable(self.level);
    }
}

impl<T, P: Port> Deref for RTIntrRefMut<'_, T, P> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T, P: Port> DerefMut for RTIntrRefMut<'_, T, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

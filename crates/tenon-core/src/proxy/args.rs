use std::any::{Any, type_name};
use std::fmt;

use crate::{CoreError, CoreResult, error::codes};

use super::CallHandle;

/// 跨代理边界传递的类型擦除值。
pub type Value = Box<dyn Any + Send>;

/// 被拦截调用的有序、可变参数序列。
///
/// # 教案式说明
/// - **意图（Why）**：拦截器需要在 `proceed()` 之前改写参数；代理又不知道参数的静态类型，
///   因此以类型擦除的槽位保存，并在读取时做受检向下转型。
/// - **契约（What）**：
///   - 槽位可以被 [`take`](Self::take) 取走，之后读取同一位置返回 `proxy.argument_missing`；
///   - 类型不符返回 `proxy.argument_type`，且槽位内容保持不变。
#[derive(Default)]
pub struct Arguments {
    slots: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个参数。
    pub fn push<T: Any + Send>(&mut self, value: T) {
        self.slots.push(Some(Box::new(value)));
    }

    /// 追加参数并返回自身，便于链式构造。
    pub fn with<T: Any + Send>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 以类型擦除形态读取参数，不做类型检查。
    pub fn raw(&self, index: usize) -> Option<&(dyn Any + Send)> {
        self.slots.get(index).and_then(|slot| slot.as_deref())
    }

    pub fn get<T: Any>(&self, index: usize) -> CoreResult<&T> {
        let value = self.raw(index).ok_or_else(|| missing(index))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(index))
    }

    pub fn get_mut<T: Any>(&mut self, index: usize) -> CoreResult<&mut T> {
        let value = self
            .slots
            .get_mut(index)
            .and_then(|slot| slot.as_deref_mut())
            .ok_or_else(|| missing(index))?;
        value
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch::<T>(index))
    }

    /// 改写指定位置的参数；位置必须已存在。
    pub fn set<T: Any + Send>(&mut self, index: usize, value: T) -> CoreResult<()> {
        let slot = self.slots.get_mut(index).ok_or_else(|| missing(index))?;
        *slot = Some(Box::new(value));
        Ok(())
    }

    /// 取走指定位置的参数。
    pub fn take<T: Any>(&mut self, index: usize) -> CoreResult<T> {
        let slot = self.slots.get_mut(index).ok_or_else(|| missing(index))?;
        let value = slot.take().ok_or_else(|| missing(index))?;
        match value.downcast::<T>() {
            Ok(typed) => Ok(*typed),
            Err(original) => {
                *slot = Some(original);
                Err(mismatch::<T>(index))
            }
        }
    }

    /// 返回按位置顺序取参的游标。
    pub fn cursor(&mut self) -> ArgCursor<'_> {
        ArgCursor {
            args: self,
            position: 0,
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.slots.len())
            .field(
                "taken",
                &self.slots.iter().filter(|slot| slot.is_none()).count(),
            )
            .finish()
    }
}

/// 顺序取参游标，供转发桩按声明顺序还原参数。
pub struct ArgCursor<'a> {
    args: &'a mut Arguments,
    position: usize,
}

impl ArgCursor<'_> {
    /// 取走下一个参数。
    pub fn take_next<T: Any>(&mut self) -> CoreResult<T> {
        let value = self.args.take::<T>(self.position)?;
        self.position += 1;
        Ok(value)
    }
}

/// 将处理器返回的擦除值还原为能力接口声明的返回类型。
pub fn downcast_return<T: Any>(value: Value, call: &CallHandle) -> CoreResult<T> {
    value.downcast::<T>().map(|typed| *typed).map_err(|_| {
        CoreError::new(
            codes::PROXY_RETURN_TYPE,
            format!("`{call}` expected a `{}` return value", type_name::<T>()),
        )
    })
}

fn missing(index: usize) -> CoreError {
    CoreError::new(
        codes::PROXY_ARGUMENT_MISSING,
        format!("argument #{index} is not available"),
    )
}

fn mismatch<T>(index: usize) -> CoreError {
    CoreError::new(
        codes::PROXY_ARGUMENT_TYPE,
        format!("argument #{index} is not a `{}`", type_name::<T>()),
    )
}

use std::any::{TypeId, type_name};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// 能力接口描述符：一个“替身对象必须支持的操作集合”的运行期身份。
///
/// # 设计背景（Why）
/// - Rust 无法在运行期为任意 trait 生成实现，因此代理机制以描述符表达“实现了哪些接口”，
///   具体的 trait 实现由 [`capability!`](crate::capability) 在编译期生成。
///
/// # 契约说明（What）
/// - 相等性与哈希只取决于 `TypeId`；`name` 仅用于展示；
/// - 排序同样只看 `TypeId`，与相等性保持一致；展示顺序由集合的声明顺序决定。
#[derive(Clone, Copy)]
pub struct Interface {
    id: TypeId,
    name: &'static str,
}

impl Interface {
    /// 以类型（通常为 `dyn Trait`）构造描述符，名称取类型路径的最后一段。
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_name(type_name::<T>()),
        }
    }

    /// 以显式名称构造描述符。
    pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    /// 展示名称。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 运行期类型标识。
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

fn short_name(full: &'static str) -> &'static str {
    let trimmed = full.strip_prefix("dyn ").unwrap_or(full);
    let head = trimmed.split('<').next().unwrap_or(trimmed);
    head.rsplit("::").next().unwrap_or(head)
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Interface {}

impl Hash for Interface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Interface {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interface {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface({})", self.name)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 由 `dyn Trait` 实现，给出该能力接口的描述符。
///
/// 通常不手写实现，而是由 [`capability!`](crate::capability) 生成。
pub trait Capability {
    /// 返回能力接口描述符。
    fn interface() -> Interface;
}

/// 替身对象实现的接口集合，构造后不可变。
///
/// # 契约说明（What）
/// - 保留声明顺序用于展示，去除重复项；
/// - [`matches`](Self::matches) 与 [`stable_hash`](Self::stable_hash) 按集合语义计算，与声明顺序无关；
/// - 进出代理时均按值复制，外部无法与代理内部共享别名。
#[derive(Clone, Debug, Default)]
pub struct InterfaceSet {
    members: Vec<Interface>,
}

impl InterfaceSet {
    /// 以任意顺序的接口构造集合，重复项只保留首次出现。
    pub fn new(interfaces: impl IntoIterator<Item = Interface>) -> Self {
        let mut members: Vec<Interface> = Vec::new();
        for interface in interfaces {
            if !members.contains(&interface) {
                members.push(interface);
            }
        }
        Self { members }
    }

    pub fn contains(&self, interface: &Interface) -> bool {
        self.members.contains(interface)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.members.iter()
    }

    /// 复制出接口列表。
    pub fn to_vec(&self) -> Vec<Interface> {
        self.members.clone()
    }

    /// 集合语义的相等判断。
    pub fn matches(&self, other: &InterfaceSet) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().all(|member| other.contains(member))
    }

    /// 与声明顺序无关的稳定哈希。
    pub fn stable_hash(&self) -> u64 {
        let mut sorted = self.members.clone();
        sorted.sort();
        let mut hasher = DefaultHasher::new();
        for interface in &sorted {
            interface.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl fmt::Display for InterfaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, interface) in self.members.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(interface.name())?;
        }
        f.write_str("]")
    }
}

/// 身份操作面的占位类型，对应 `equals/hash_code/to_string` 三个调用。
enum IdentitySurface {}

/// 身份操作的种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Equals,
    HashCode,
    ToString,
}

impl IdentityKind {
    fn method(self) -> &'static str {
        match self {
            IdentityKind::Equals => "equals",
            IdentityKind::HashCode => "hash_code",
            IdentityKind::ToString => "to_string",
        }
    }
}

/// 被拦截调用的句柄：`(接口, 方法名)`。
///
/// # 契约说明（What）
/// - 句柄可复制、可作为分发表键；
/// - 身份操作使用保留的伪接口，见 [`CallHandle::identity`] 与 [`CallHandle::identity_kind`]。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallHandle {
    interface: Interface,
    method: &'static str,
}

impl CallHandle {
    pub fn new(interface: Interface, method: &'static str) -> Self {
        Self { interface, method }
    }

    /// 构造身份操作句柄。
    pub fn identity(kind: IdentityKind) -> Self {
        Self::new(
            Interface::named::<IdentitySurface>("Identity"),
            kind.method(),
        )
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// 若句柄属于身份操作面，返回其种类。
    pub fn identity_kind(&self) -> Option<IdentityKind> {
        if self.interface.type_id() != TypeId::of::<IdentitySurface>() {
            return None;
        }
        [
            IdentityKind::Equals,
            IdentityKind::HashCode,
            IdentityKind::ToString,
        ]
        .into_iter()
        .find(|kind| kind.method() == self.method)
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallHandle({}::{})", self.interface.name(), self.method)
    }
}

impl fmt::Display for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.interface.name(), self.method)
    }
}

/// 将若干 `dyn Trait` 展开为接口描述符数组。
///
/// ```rust
/// use tenon_core::{capability, interfaces, CoreResult};
///
/// capability! {
///     pub trait Runnable {
///         fn run(&self) -> CoreResult<()>;
///     }
/// }
///
/// let set = interfaces![dyn Runnable];
/// assert_eq!(set[0].name(), "Runnable");
/// ```
#[macro_export]
macro_rules! interfaces {
    ($($capability:ty),* $(,)?) => {
        [$(<$capability as $crate::proxy::Capability>::interface()),*]
    };
}

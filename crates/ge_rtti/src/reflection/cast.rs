use crate::{Reflectable, Typed};

// -----------------------------------------------------------------------------
// Type queries

/// Returns `true` if the most derived type of `object` is exactly `T`.
///
/// # Examples
///
/// ```
/// use ge_rtti::{Reflectable, rtti_is_of_type, rtti_is_subclass};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 40, name = "Component")]
/// struct Component {
///     #[rtti(id = 1)]
///     enabled: bool,
/// }
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 41, name = "Light", base = component)]
/// struct Light {
///     component: Component,
///     #[rtti(id = 2)]
///     intensity: f32,
/// }
///
/// let light = Light::default();
/// assert!(rtti_is_of_type::<Light>(&light));
/// assert!(!rtti_is_of_type::<Component>(&light));
/// assert!(rtti_is_subclass::<Component>(&light));
/// ```
#[inline]
pub fn rtti_is_of_type<T: Typed>(object: &dyn Reflectable) -> bool {
    object.rtti_id() == T::rtti_static().rtti_id()
}

/// Returns `true` if the type of `object` is `T` or derives from `T`.
#[inline]
pub fn rtti_is_subclass<T: Typed>(object: &dyn Reflectable) -> bool {
    object.rtti().is_subtype_of(T::rtti_static())
}

// -----------------------------------------------------------------------------
// Casts

/// Casts `object` to `T`.
///
/// Succeeds when the object is a `T`, or when `T` is one of its base types,
/// in which case the embedded base value is returned.
///
/// # Examples
///
/// ```
/// use ge_rtti::{Reflectable, rtti_cast};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 50, name = "Shape")]
/// struct Shape {
///     #[rtti(id = 1)]
///     layer: u8,
/// }
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 51, name = "Circle", base = shape)]
/// struct Circle {
///     shape: Shape,
///     #[rtti(id = 2)]
///     radius: f32,
/// }
///
/// let circle = Circle { shape: Shape { layer: 3 }, radius: 1.0 };
/// let object: &dyn Reflectable = &circle;
///
/// assert_eq!(rtti_cast::<Shape>(object).unwrap().layer, 3);
/// assert!(rtti_cast::<Circle>(object).is_some());
/// assert!(rtti_cast::<Circle>(&circle.shape).is_none());
/// ```
pub fn rtti_cast<T: Typed>(object: &dyn Reflectable) -> Option<&T> {
    let target = T::rtti_static().rtti_id();
    let mut current = object;
    loop {
        if current.rtti_id() == target {
            return current.downcast_ref::<T>();
        }
        let base = current.rtti().base()?;
        current = base.project(current)?;
    }
}

/// Mutable version of [`rtti_cast`].
pub fn rtti_cast_mut<T: Typed>(object: &mut dyn Reflectable) -> Option<&mut T> {
    if object.rtti_id() == T::rtti_static().rtti_id() {
        return object.downcast_mut::<T>();
    }
    let base = object.rtti().base()?;
    rtti_cast_mut::<T>(base.project_mut(object)?)
}

// -----------------------------------------------------------------------------
// Inheritance levels

/// The part of `object` that belongs to its `depth`-th ancestor,
/// `0` being the object itself.
pub(crate) fn level(object: &dyn Reflectable, depth: usize) -> Option<&dyn Reflectable> {
    let mut current = object;
    for _ in 0..depth {
        let base = current.rtti().base()?;
        current = base.project(current)?;
    }
    Some(current)
}

/// Mutable version of [`level`].
pub(crate) fn level_mut(object: &mut dyn Reflectable, depth: usize) -> Option<&mut dyn Reflectable> {
    let mut current = object;
    for _ in 0..depth {
        let base = current.rtti().base()?;
        current = base.project_mut(current)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::{level, level_mut};
    use crate::{Reflectable, rtti_cast_mut};

    #[derive(Reflectable, Default)]
    #[rtti(id = 60, name = "cast::Root")]
    struct Root {
        #[rtti(id = 1)]
        tag: u16,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 61, name = "cast::Middle", base = root)]
    struct Middle {
        root: Root,
        #[rtti(id = 2)]
        depth: u8,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 62, name = "cast::Leaf", base = middle)]
    struct Leaf {
        middle: Middle,
        #[rtti(id = 3)]
        name: String,
    }

    #[test]
    fn levels_follow_base_chain() {
        let mut leaf = Leaf::default();
        leaf.middle.root.tag = 9;

        assert_eq!(level(&leaf, 0).unwrap().rtti_name(), "cast::Leaf");
        assert_eq!(level(&leaf, 1).unwrap().rtti_name(), "cast::Middle");
        assert_eq!(level(&leaf, 2).unwrap().rtti_name(), "cast::Root");
        assert!(level(&leaf, 3).is_none());

        let root = level_mut(&mut leaf, 2).unwrap();
        root.downcast_mut::<Root>().unwrap().tag = 12;
        assert_eq!(leaf.middle.root.tag, 12);
    }

    #[test]
    fn cast_mut_through_two_levels() {
        let mut leaf = Leaf::default();
        rtti_cast_mut::<Root>(&mut leaf).unwrap().tag = 4;
        rtti_cast_mut::<Middle>(&mut leaf).unwrap().depth = 2;
        assert_eq!(leaf.middle.root.tag, 4);
        assert_eq!(leaf.middle.depth, 2);
        assert!(rtti_cast_mut::<Leaf>(&mut leaf.middle).is_none());
    }
}

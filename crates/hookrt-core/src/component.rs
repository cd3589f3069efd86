use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::scope::Scope;

/// Props accepted by a component. Equality decides whether a memoized
/// component can skip a render.
pub trait Props: Clone + PartialEq + 'static {}

impl<T: Clone + PartialEq + 'static> Props for T {}

type RenderFn<P> = dyn Fn(&mut Scope<'_>, &P) -> Result<Element>;
type FallbackFn = dyn Fn(&Error) -> Element;

/// A render function plus how the tree should treat its instances.
///
/// Two components are the same component when they share a name and a props
/// type; a child position that switches to a different component is
/// remounted.
pub struct Component<P> {
    name: &'static str,
    render: Rc<RenderFn<P>>,
    memo: bool,
    fallback: Option<Rc<FallbackFn>>,
}

impl<P: Props> Component<P> {
    pub fn new(
        name: &'static str,
        render: impl Fn(&mut Scope<'_>, &P) -> Result<Element> + 'static,
    ) -> Self {
        Self {
            name,
            render: Rc::new(render),
            memo: false,
            fallback: None,
        }
    }

    /// Skip re-rendering with the parent when the new props equal the old ones.
    pub fn memo(mut self) -> Self {
        self.memo = true;
        self
    }

    /// Intercept render faults of descendants and show `fallback` instead.
    pub fn error_boundary(mut self, fallback: impl Fn(&Error) -> Element + 'static) -> Self {
        self.fallback = Some(Rc::new(fallback));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_memo(&self) -> bool {
        self.memo
    }
}

impl<P> Clone for Component<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            render: Rc::clone(&self.render),
            memo: self.memo,
            fallback: self.fallback.clone(),
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("memo", &self.memo)
            .field("error_boundary", &self.fallback.is_some())
            .finish()
    }
}

/// Props-erased view of a [`Component`] stored on instances.
pub(crate) trait ErasedComponent {
    fn name(&self) -> &'static str;
    fn props_type(&self) -> TypeId;
    fn is_memo(&self) -> bool;
    fn is_error_boundary(&self) -> bool;
    fn fallback(&self, error: &Error) -> Element;
    fn render(&self, scope: &mut Scope<'_>, props: &dyn Any) -> Result<Element>;
    fn props_equal(&self, previous: &dyn Any, next: &dyn Any) -> bool;
}

impl<P: Props> ErasedComponent for Component<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn props_type(&self) -> TypeId {
        TypeId::of::<P>()
    }

    fn is_memo(&self) -> bool {
        self.memo
    }

    fn is_error_boundary(&self) -> bool {
        self.fallback.is_some()
    }

    fn fallback(&self, error: &Error) -> Element {
        self.fallback
            .as_ref()
            .map_or(Element::Empty, |fallback| fallback(error))
    }

    fn render(&self, scope: &mut Scope<'_>, props: &dyn Any) -> Result<Element> {
        let props = props.downcast_ref::<P>().ok_or(Error::PropsType {
            instance: scope.instance_id(),
            component: self.name,
        })?;
        (self.render)(scope, props)
    }

    fn props_equal(&self, previous: &dyn Any, next: &dyn Any) -> bool {
        match (previous.downcast_ref::<P>(), next.downcast_ref::<P>()) {
            (Some(previous), Some(next)) => previous == next,
            _ => false,
        }
    }
}

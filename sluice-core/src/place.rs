use crate::{Error, Result};
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::{self, Debug},
    ops::{Deref, DerefMut},
};

/// Caller owned storage referenced by a binding.
///
/// `Cell` lets the caller keep reading and writing the value between executions and fetches while
/// the statement holds on to it.
pub enum Place<'a, T> {
    Shared(&'a T),
    Exclusive(&'a mut T),
    Cell(&'a RefCell<T>),
}

impl<'a, T> Place<'a, T> {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Place::Shared(..))
    }

    pub fn get(&self) -> Result<PlaceRef<'_, T>> {
        Ok(match self {
            Place::Shared(v) => PlaceRef::Plain(*v),
            Place::Exclusive(v) => PlaceRef::Plain(&**v),
            Place::Cell(v) => PlaceRef::Cell(v.try_borrow().map_err(|_| {
                Error::msg("The bound value is mutably borrowed by the caller")
            })?),
        })
    }

    pub fn get_mut(&mut self) -> Result<PlaceMut<'_, T>> {
        Ok(match self {
            Place::Shared(..) => {
                return Err(Error::msg("Attempted modification of const use element"));
            }
            Place::Exclusive(v) => PlaceMut::Plain(&mut **v),
            Place::Cell(v) => PlaceMut::Cell(
                v.try_borrow_mut()
                    .map_err(|_| Error::msg("The bound value is borrowed by the caller"))?,
            ),
        })
    }
}

impl<T> Debug for Place<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Place::Shared(..) => "Place::Shared",
            Place::Exclusive(..) => "Place::Exclusive",
            Place::Cell(..) => "Place::Cell",
        })
    }
}

pub enum PlaceRef<'p, T> {
    Plain(&'p T),
    Cell(Ref<'p, T>),
}

impl<T> Deref for PlaceRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            PlaceRef::Plain(v) => *v,
            PlaceRef::Cell(v) => &**v,
        }
    }
}

pub enum PlaceMut<'p, T> {
    Plain(&'p mut T),
    Cell(RefMut<'p, T>),
}

impl<T> Deref for PlaceMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            PlaceMut::Plain(v) => &**v,
            PlaceMut::Cell(v) => &**v,
        }
    }
}

impl<T> DerefMut for PlaceMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            PlaceMut::Plain(v) => &mut **v,
            PlaceMut::Cell(v) => &mut **v,
        }
    }
}

/// Storage an into binding can write to.
pub trait IntoTarget<'a, T> {
    fn into_place(self) -> Place<'a, T>;
}

impl<'a, T> IntoTarget<'a, T> for &'a mut T {
    fn into_place(self) -> Place<'a, T> {
        Place::Exclusive(self)
    }
}

impl<'a, T> IntoTarget<'a, T> for &'a RefCell<T> {
    fn into_place(self) -> Place<'a, T> {
        Place::Cell(self)
    }
}

/// Storage a use binding reads from, a shared reference makes the binding read only.
pub trait UseSource<'a, T> {
    fn into_place(self) -> Place<'a, T>;
}

impl<'a, T> UseSource<'a, T> for &'a T {
    fn into_place(self) -> Place<'a, T> {
        Place::Shared(self)
    }
}

impl<'a, T> UseSource<'a, T> for &'a mut T {
    fn into_place(self) -> Place<'a, T> {
        Place::Exclusive(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_borrows() {
        let cell = RefCell::new(1);
        let mut place = IntoTarget::into_place(&cell);
        *place.get_mut().expect("not borrowed") = 2;
        {
            let _guard = cell.borrow();
            assert!(place.get_mut().is_err());
            assert_eq!(*place.get().expect("shared borrows coexist"), 2);
        }
        assert_eq!(*cell.borrow(), 2);
    }

    #[test]
    fn shared_is_read_only() {
        let value = 3;
        let mut place = UseSource::into_place(&value);
        assert!(place.is_read_only());
        assert!(place.get_mut().is_err());
        assert_eq!(*place.get().expect("readable"), 3);
    }
}

use crate::{Result, Session};
use std::ops::{Deref, DerefMut};

/// Transaction scope, rolled back when dropped without [`commit`](Self::commit).
pub struct Transaction<'s> {
    session: &'s mut Session,
    active: bool,
}

impl<'s> Transaction<'s> {
    pub fn new(session: &'s mut Session) -> Result<Self> {
        session.begin()?;
        Ok(Self {
            session,
            active: true,
        })
    }

    pub fn commit(mut self) -> Result<()> {
        self.active = false;
        self.session.commit()
    }

    pub fn rollback(mut self) -> Result<()> {
        self.active = false;
        self.session.rollback()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Deref for Transaction<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &*self.session
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut *self.session
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(error) = self.session.rollback() {
                log::warn!("Could not roll back the transaction: {:#}", error);
            }
        }
    }
}

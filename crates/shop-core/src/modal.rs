//! Modal lifecycle.
//!
//! Dialogs open through the page's widget framework when it is present and
//! through a manual class-toggling backend otherwise. The framework backend
//! is chosen once at startup; a failing framework call falls back to the
//! manual backend for that call only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModalError {
    #[error("modal #{0} not found")]
    NotFound(String),
    #[error("framework call failed: {0}")]
    Framework(String),
}

pub trait ModalBackend {
    fn name(&self) -> &'static str;
    fn open(&self, id: &str) -> Result<(), ModalError>;
    fn close(&self, id: &str) -> Result<(), ModalError>;
    /// Strip leftover scroll locks, overlays and open markers from the page.
    fn reset_page(&self) {}
}

pub struct ModalController {
    manual: Rc<dyn ModalBackend>,
    framework: Option<Rc<dyn ModalBackend>>,
    open: RefCell<Vec<String>>,
    saved_scroll: Cell<Option<f64>>,
}

impl ModalController {
    pub fn new(manual: Rc<dyn ModalBackend>, framework: Option<Rc<dyn ModalBackend>>) -> Self {
        match &framework {
            Some(fw) => debug!(backend = fw.name(), "modal backend selected"),
            None => debug!(backend = manual.name(), "no framework, using manual modals"),
        }
        Self {
            manual,
            framework,
            open: RefCell::new(Vec::new()),
            saved_scroll: Cell::new(None),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.framework.as_ref().unwrap_or(&self.manual).name()
    }

    fn dispatch(
        &self,
        id: &str,
        call: impl Fn(&dyn ModalBackend, &str) -> Result<(), ModalError>,
    ) -> Result<(), ModalError> {
        if let Some(fw) = &self.framework {
            match call(fw.as_ref(), id) {
                Ok(()) => return Ok(()),
                Err(ModalError::Framework(reason)) => {
                    warn!(modal = id, "framework error, using fallback: {}", reason);
                }
                Err(err) => return Err(err),
            }
        }
        call(self.manual.as_ref(), id)
    }

    pub fn open(&self, id: &str) -> Result<(), ModalError> {
        self.dispatch(id, |b, id| b.open(id))?;
        let mut open = self.open.borrow_mut();
        if !open.iter().any(|o| o == id) {
            open.push(id.to_owned());
        }
        Ok(())
    }

    pub fn close(&self, id: &str) -> Result<(), ModalError> {
        let result = self.dispatch(id, |b, id| b.close(id));
        self.open.borrow_mut().retain(|o| o != id);
        result
    }

    /// Close every modal opened through this controller, newest first.
    pub fn close_all(&self) -> Vec<String> {
        let ids: Vec<String> = self.open.borrow().iter().rev().cloned().collect();
        for id in &ids {
            if let Err(err) = self.close(id) {
                warn!(modal = %id, "close failed: {}", err);
            }
        }
        ids
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.borrow().iter().any(|o| o == id)
    }

    pub fn any_open(&self) -> bool {
        !self.open.borrow().is_empty()
    }

    pub fn remember_scroll(&self, y: f64) {
        self.saved_scroll.set(Some(y));
    }

    pub fn take_scroll(&self) -> Option<f64> {
        self.saved_scroll.take()
    }

    /// Force the page back to a no-modal state.
    pub fn restore_page_state(&self) {
        self.open.borrow_mut().clear();
        if let Some(fw) = &self.framework {
            fw.reset_page();
        }
        self.manual.reset_page();
    }
}

// WindowToken: a client-owned identity that owns zero or more windows.
//
// Grounded on server/WindowToken.h. The token owns its children by a
// stable id (§9 cyclic-reference note: "the token owns an indexed list
// of child windows by stable id; children hold the token id and look up
// via the registry") rather than by pointer, so this struct holds no
// back-reference to WindowState at all.
use crate::layout::WindowType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientVisibility {
    Visible,
    Hold,
    Gone,
}

pub type ClientHandle = u64;

#[derive(Debug)]
pub struct WindowToken {
    pub id: u64,
    pub window_type: WindowType,
    pub display_id: i32,
    pub client_pid: i32,
    children: Vec<ClientHandle>,
    client_visibility: ClientVisibility,
    persist_on_empty: bool,
    removed: bool,
}

impl WindowToken {
    pub fn new(id: u64, window_type: WindowType, display_id: i32, client_pid: i32) -> Self {
        Self {
            id,
            window_type,
            display_id,
            client_pid,
            children: Vec::new(),
            client_visibility: ClientVisibility::Visible,
            persist_on_empty: false,
            removed: false,
        }
    }

    pub fn add_window(&mut self, client: ClientHandle) {
        if !self.children.contains(&client) {
            self.children.push(client);
        }
    }

    pub fn remove_window(&mut self, client: ClientHandle) {
        self.children.retain(|c| *c != client);
    }

    pub fn children(&self) -> &[ClientHandle] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn client_visibility(&self) -> ClientVisibility {
        self.client_visibility
    }

    pub fn set_client_visibility(&mut self, v: ClientVisibility) {
        self.client_visibility = v;
    }

    pub fn set_persist_on_empty(&mut self, persist: bool) {
        self.persist_on_empty = persist;
    }

    pub fn is_persist_on_empty(&self) -> bool {
        self.persist_on_empty
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn mark_removed(&mut self) {
        self.removed = true;
    }
}

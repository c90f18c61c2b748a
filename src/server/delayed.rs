//! Listener registration for entries that do not exist yet.
//!
//! A registration whose base entry is missing is wrapped in one
//! [`DelayedConfigAddListener`] per missing ancestor and anchored at the nearest
//! existing one. When the awaited child is added, the link installs what it
//! wraps at the child and removes itself, so the chain advances one level per
//! add until the real adaptor sits at its base entry.
//!
//! ```text
//! cn=config            <- Delayed(child = cn=pool,cn=config)
//!   cn=pool (missing)        wraps Add(adaptor)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use nanoid::nanoid;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::listener::ListenerKey;
use super::ConfigAddListenerAdaptor;
use super::ConfigDeleteListenerAdaptor;
use super::ServerManagementContext;
use crate::constants::CHAIN_ID_LEN;
use crate::AddListenerSlot;
use crate::ConfigAddListener;
use crate::ConfigChangeResult;
use crate::ConfigurationError;
use crate::ConfigurationRepository;
use crate::DeleteListenerSlot;
use crate::Dn;
use crate::Entry;
use crate::Result;
use crate::UnacceptableReasons;

/// What a delayed link installs once its child exists.
#[derive(Clone)]
pub enum DelayedTarget {
    /// The next link of the chain, one level deeper
    Delayed(Arc<DelayedConfigAddListener>),
    /// Installed as an add listener
    Add(Arc<ConfigAddListenerAdaptor>),
    /// Installed as a delete listener
    Delete(Arc<ConfigDeleteListenerAdaptor>),
}

impl fmt::Debug for DelayedTarget {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DelayedTarget::Delayed(d) => write!(f, "Delayed({})", d.child_dn),
            DelayedTarget::Add(a) => write!(f, "Add({a:?})"),
            DelayedTarget::Delete(d) => write!(f, "Delete({d:?})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Registered at `parent_dn`, waiting for `child_dn`
    Pending,
    /// Target installed at `child_dn`, link removed
    Fired,
    /// Removed by deregistration before firing
    Cancelled,
}

/// One link of a delayed registration chain.
pub struct DelayedConfigAddListener {
    parent_dn: Dn,
    child_dn: Dn,
    target: DelayedTarget,
    chain_id: Arc<str>,
    repository: Weak<dyn ConfigurationRepository>,
    this: Weak<DelayedConfigAddListener>,
    state: Mutex<LinkState>,
}

impl DelayedConfigAddListener {
    fn new(
        parent_dn: Dn,
        child_dn: Dn,
        target: DelayedTarget,
        chain_id: Arc<str>,
        repository: Weak<dyn ConfigurationRepository>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            parent_dn,
            child_dn,
            target,
            chain_id,
            repository,
            this: this.clone(),
            state: Mutex::new(LinkState::Pending),
        })
    }

    /// Entry this link is registered at.
    pub fn parent_dn(&self) -> &Dn {
        &self.parent_dn
    }

    /// Entry whose addition fires this link.
    pub fn child_dn(&self) -> &Dn {
        &self.child_dn
    }

    pub fn target(&self) -> &DelayedTarget {
        &self.target
    }

    /// Identifier shared by every link of the chain.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Number of links from this one down to the terminal adaptor.
    pub fn chain_len(&self) -> usize {
        match &self.target {
            DelayedTarget::Delayed(next) => 1 + next.chain_len(),
            _ => 1,
        }
    }

    /// Whether the link `depth - 1` levels below this one waits for `target_dn`
    /// and wraps the terminal listener identified by `terminal`.
    fn innermost_matches(
        &self,
        depth: usize,
        target_dn: &Dn,
        terminal: &TerminalMatch,
    ) -> bool {
        let mut link = self;
        for _ in 1..depth {
            match &link.target {
                DelayedTarget::Delayed(next) => link = next.as_ref(),
                _ => return false,
            }
        }
        if &link.child_dn != target_dn {
            return false;
        }
        match (&link.target, terminal) {
            (DelayedTarget::Add(adaptor), TerminalMatch::Add(key)) => adaptor.key() == *key,
            (DelayedTarget::Delete(adaptor), TerminalMatch::Delete(key)) => adaptor.key() == *key,
            _ => false,
        }
    }

    /// Moves `Pending` to `Cancelled`, reporting the state found.
    fn cancel(&self) -> LinkState {
        let mut state = self.state.lock();
        let found = *state;
        if found == LinkState::Pending {
            *state = LinkState::Cancelled;
        }
        found
    }

    /// Installs the target at `child_dn` and removes this link from `parent_dn`.
    ///
    /// Runs under the link's state lock so a concurrent cancel either happens
    /// before, and firing is skipped, or after, and finds the chain moved.
    fn fire(&self) {
        let mut state = self.state.lock();
        if *state != LinkState::Pending {
            trace!(chain_id = %self.chain_id, state = ?*state, "delayed listener no longer pending");
            return;
        }
        let Some(repository) = self.repository.upgrade() else {
            warn!(chain_id = %self.chain_id, child = %self.child_dn, "repository gone, delayed listener not relocated");
            return;
        };

        if let Err(e) = install(repository.as_ref(), &self.child_dn, self.target.clone()) {
            error!(chain_id = %self.chain_id, child = %self.child_dn, "Unable to relocate delayed listener: {}", e);
            return;
        }
        if let Some(this) = self.this.upgrade() {
            if let Err(e) = repository.deregister_add_listener(&self.parent_dn, &AddListenerSlot::Delayed(this)) {
                warn!(chain_id = %self.chain_id, parent = %self.parent_dn, "Unable to deregister delayed listener: {}", e);
            }
        }
        *state = LinkState::Fired;
        debug!(
            chain_id = %self.chain_id,
            from = %self.parent_dn,
            to = %self.child_dn,
            target = ?self.target,
            "delayed listener relocated"
        );
    }
}

impl ConfigAddListener for DelayedConfigAddListener {
    fn config_add_is_acceptable(
        &self,
        _entry: &Entry,
        _reasons: &mut UnacceptableReasons,
    ) -> bool {
        true
    }

    fn apply_configuration_add(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult {
        if entry.dn() == &self.child_dn {
            self.fire();
        } else {
            trace!(chain_id = %self.chain_id, dn = %entry.dn(), waiting_for = %self.child_dn, "ignoring unrelated add");
        }
        ConfigChangeResult::new()
    }
}

impl fmt::Debug for DelayedConfigAddListener {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DelayedConfigAddListener")
            .field("chain_id", &self.chain_id)
            .field("parent_dn", &self.parent_dn)
            .field("child_dn", &self.child_dn)
            .field("state", &self.state.try_lock().map(|s| *s))
            .field("target", &self.target)
            .finish()
    }
}

/// Terminal listener a deregistration is looking for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TerminalMatch {
    Add(ListenerKey),
    Delete(ListenerKey),
}

fn install(
    repository: &dyn ConfigurationRepository,
    dn: &Dn,
    target: DelayedTarget,
) -> Result<()> {
    match target {
        DelayedTarget::Delayed(link) => repository.register_add_listener(dn, AddListenerSlot::Delayed(link)),
        DelayedTarget::Add(adaptor) => repository.register_add_listener(dn, AddListenerSlot::Adaptor(adaptor)),
        DelayedTarget::Delete(adaptor) => repository.register_delete_listener(dn, DeleteListenerSlot::Adaptor(adaptor)),
    }
}

/// Registers `target` at `target_dn`, or at its nearest existing ancestor
/// behind one delayed link per missing level.
pub(crate) fn register_with_delay(
    repository: &Arc<dyn ConfigurationRepository>,
    target_dn: &Dn,
    target: DelayedTarget,
    max_depth: usize,
) -> Result<()> {
    if repository.has_entry(target_dn)? {
        return install(repository.as_ref(), target_dn, target);
    }

    let chain_id: Arc<str> = Arc::from(nanoid!(CHAIN_ID_LEN));
    let mut child = target_dn.clone();
    let mut link = target;
    let mut depth = 0;
    loop {
        let Some(parent) = child.parent() else {
            return Err(ConfigurationError::NoAnchor { dn: target_dn.clone() }.into());
        };
        depth += 1;
        if depth > max_depth {
            return Err(ConfigurationError::DelayedChainTooDeep {
                dn: target_dn.clone(),
                max: max_depth,
            }
            .into());
        }

        let delayed = DelayedConfigAddListener::new(
            parent.clone(),
            child,
            link,
            chain_id.clone(),
            Arc::downgrade(repository),
        );
        if repository.has_entry(&parent)? {
            debug!(%chain_id, anchor = %parent, target = %target_dn, depth, "delayed listener registered");
            return repository.register_add_listener(&parent, AddListenerSlot::Delayed(delayed));
        }
        if parent.is_root() {
            return Err(ConfigurationError::NoAnchor { dn: target_dn.clone() }.into());
        }
        link = DelayedTarget::Delayed(delayed);
        child = parent;
    }
}

enum Walk {
    Done,
    /// A matching link fired while being cancelled
    Moved,
}

/// Removes the terminal listener registered for `target_dn`, wherever its chain
/// currently is. Finding nothing is not an error; repository failures are logged.
pub(crate) fn deregister_with_delay(
    context: &ServerManagementContext,
    target_dn: &Dn,
    terminal: TerminalMatch,
) {
    let repository = match context.repository() {
        Ok(r) => r,
        Err(e) => {
            warn!(target = %target_dn, "Unable to deregister listener: {}", e);
            return;
        }
    };

    // Each retry follows a chain that advanced one level, so this is bounded by its length.
    for _ in 0..=context.max_delayed_depth() {
        match walk_and_deregister(repository.as_ref(), target_dn, &terminal) {
            Ok(Walk::Done) => return,
            Ok(Walk::Moved) => trace!(target = %target_dn, "delayed chain moved during deregistration, retrying"),
            Err(e) => {
                warn!(target = %target_dn, "Unable to deregister listener: {}", e);
                return;
            }
        }
    }
}

fn walk_and_deregister(
    repository: &dyn ConfigurationRepository,
    target_dn: &Dn,
    terminal: &TerminalMatch,
) -> Result<Walk> {
    if repository.has_entry(target_dn)? {
        deregister_terminal(repository, target_dn, terminal)?;
    }

    // A link whose child was just stored may not have fired yet, so every
    // ancestor is scanned, not only the nearest existing one.
    let mut moved = false;
    for (depth, ancestor) in (1..).zip(target_dn.ancestors()) {
        for slot in repository.get_add_listeners(&ancestor) {
            let AddListenerSlot::Delayed(link) = &slot else {
                continue;
            };
            if !link.innermost_matches(depth, target_dn, terminal) {
                continue;
            }
            match link.cancel() {
                LinkState::Pending => {
                    repository.deregister_add_listener(&ancestor, &slot)?;
                    debug!(chain_id = %link.chain_id, anchor = %ancestor, target = %target_dn, "delayed listener cancelled");
                }
                LinkState::Fired => {
                    // The chain continues one level down; drop the stale entry if it is still listed.
                    repository.deregister_add_listener(&ancestor, &slot)?;
                    moved = true;
                }
                LinkState::Cancelled => {}
            }
        }
    }
    Ok(if moved { Walk::Moved } else { Walk::Done })
}

fn deregister_terminal(
    repository: &dyn ConfigurationRepository,
    dn: &Dn,
    terminal: &TerminalMatch,
) -> Result<()> {
    match terminal {
        TerminalMatch::Add(key) => {
            for slot in repository.get_add_listeners(dn) {
                if matches!(&slot, AddListenerSlot::Adaptor(a) if a.key() == *key) {
                    repository.deregister_add_listener(dn, &slot)?;
                    debug!(%dn, "add listener deregistered");
                }
            }
        }
        TerminalMatch::Delete(key) => {
            for slot in repository.get_delete_listeners(dn) {
                if matches!(&slot, DeleteListenerSlot::Adaptor(a) if a.key() == *key) {
                    repository.deregister_delete_listener(dn, &slot)?;
                    debug!(%dn, "delete listener deregistered");
                }
            }
        }
    }
    Ok(())
}

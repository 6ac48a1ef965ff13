//! Role-based access decisions backed by casbin.
//!
//! The model is a plain RBAC model (`casbin/model.conf`): `p` lines grant a
//! role an action on an object and `g` lines make one role include another.
//! A session is allowed an action when its username or any of its effective
//! roles is. The enforcer itself is never mutated per session; toggling a role
//! only changes the set of subjects checked.
//!
//! Decisions are cached for `POLICY_TTL` seconds, keyed by the full subject
//! set, so a toggled role set never sees a stale answer.

use std::collections::BTreeSet;
use std::sync::Arc;

use cached::{Cached, TimedCache};
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, RbacApi};
use tokio::sync::Mutex;
use usermgr_core::permissions::{Permissions, PERMISSION_CHECKS};
use usermgr_core::roles::compute_effective_app_roles;

use crate::config::PolicyConfig;

/// Built-in RBAC model, used unless `CASBIN_MODEL` names another file.
pub const MODEL_CONF: &str = include_str!("../casbin/model.conf");

/// `(sorted subjects, object, action)`.
type AccessKey = (String, String, String);

pub struct PolicyEnforcer {
    enforcer: Mutex<Enforcer>,
    /// `None` when `POLICY_TTL` is `0`.
    cache: Option<Arc<Mutex<TimedCache<AccessKey, bool>>>>,
}

impl PolicyEnforcer {
    /// Load the model and the policy file.
    pub async fn from_config(config: &PolicyConfig) -> casbin::Result<Self> {
        let model = match &config.model_path {
            Some(path) => DefaultModel::from_file(path.as_str()).await?,
            None => DefaultModel::from_str(MODEL_CONF).await?,
        };
        let adapter = FileAdapter::new(config.policy_path.clone());
        let enforcer = Enforcer::new(model, adapter).await?;
        tracing::info!(
            policy = %config.policy_path,
            ttl_secs = config.ttl_secs,
            "Access policy loaded",
        );

        let cache = (config.ttl_secs > 0)
            .then(|| Arc::new(Mutex::new(TimedCache::with_lifespan(config.ttl_secs))));

        Ok(Self {
            enforcer: Mutex::new(enforcer),
            cache,
        })
    }

    /// Whether `username` or any of `roles` may perform `action` on `object`.
    ///
    /// `bypass_cache` forces a fresh evaluation (used in debug mode) and does
    /// not store the result.
    pub async fn check_access(
        &self,
        username: &str,
        roles: &BTreeSet<String>,
        object: &str,
        action: &str,
        bypass_cache: bool,
    ) -> casbin::Result<bool> {
        let cache = self.cache.as_ref().filter(|_| !bypass_cache);
        let key = cache.map(|_| access_key(username, roles, object, action));

        if let (Some(cache), Some(key)) = (cache, &key) {
            if let Some(allowed) = cache.lock().await.cache_get(key) {
                tracing::trace!(object, action, "Policy cache hit");
                return Ok(*allowed);
            }
        }

        let allowed = {
            let enforcer = self.enforcer.lock().await;
            let mut allowed = enforcer.enforce((username, object, action))?;
            for role in roles {
                if allowed {
                    break;
                }
                allowed = enforcer.enforce((role.as_str(), object, action))?;
            }
            allowed
        };
        tracing::debug!(username, object, action, allowed, "Access check");

        if let (Some(cache), Some(key)) = (cache, key) {
            cache.lock().await.cache_set(key, allowed);
        }
        Ok(allowed)
    }

    /// The roles plus every role they include through `g` lines, transitively.
    ///
    /// `ADMINISTRATOR` always expands to every application role, whatever the
    /// policy file says.
    pub async fn roles_of_roles<'a, I>(&self, roles: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut enforcer = self.enforcer.lock().await;
        let mut closure = BTreeSet::new();
        let mut pending: Vec<String> = compute_effective_app_roles(roles).into_iter().collect();
        while let Some(role) = pending.pop() {
            if !closure.insert(role.clone()) {
                continue;
            }
            for inherited in enforcer.get_roles_for_user(&role, None) {
                if !closure.contains(&inherited) {
                    pending.push(inherited);
                }
            }
        }
        closure
    }

    /// Evaluate every named permission for a subject set.
    pub async fn permissions(
        &self,
        username: &str,
        roles: &BTreeSet<String>,
        bypass_cache: bool,
    ) -> casbin::Result<Permissions> {
        let mut permissions = Permissions::default();
        for (name, object, action) in PERMISSION_CHECKS {
            let granted = self
                .check_access(username, roles, object, action, bypass_cache)
                .await?;
            permissions.set(name, granted);
        }
        Ok(permissions)
    }

    /// Forget all cached decisions.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().await.cache_clear();
            tracing::info!("Policy cache cleared");
        }
    }

    /// Number of cached decisions.
    pub async fn cache_size(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.lock().await.cache_size(),
            None => 0,
        }
    }
}

fn access_key(username: &str, roles: &BTreeSet<String>, object: &str, action: &str) -> AccessKey {
    let mut subjects = username.to_string();
    for role in roles {
        subjects.push('|');
        subjects.push_str(role);
    }
    (subjects, object.to_string(), action.to_string())
}

use crate::domain::model::{Collaborator, MapDoc, MapRole};
use crate::utils::error::{MapiesError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
    Manage,
    Own,
}

impl Permission {
    fn required_role(&self) -> MapRole {
        match self {
            Permission::View => MapRole::Viewer,
            Permission::Edit => MapRole::Editor,
            Permission::Manage => MapRole::Admin,
            Permission::Own => MapRole::Owner,
        }
    }
}

pub fn role_of(map: &MapDoc, user_id: &str) -> Option<MapRole> {
    if map.owner_id == user_id {
        return Some(MapRole::Owner);
    }
    map.collaborators
        .iter()
        .find(|c| c.user_id == user_id)
        .map(|c| c.role)
}

pub fn can(map: &MapDoc, user_id: &str, permission: Permission) -> bool {
    if permission == Permission::View && map.is_public {
        return true;
    }
    role_of(map, user_id)
        .map(|role| role >= permission.required_role())
        .unwrap_or(false)
}

pub fn ensure(map: &MapDoc, user_id: &str, permission: Permission) -> Result<()> {
    if can(map, user_id, permission) {
        Ok(())
    } else {
        Err(MapiesError::permission(format!(
            "user '{}' cannot {:?} map '{}'",
            user_id, permission, map.id
        )))
    }
}

/// 新增或更新協作者；不能透過分享授予 owner
pub fn add_collaborator(
    map: &mut MapDoc,
    actor_id: &str,
    user_id: &str,
    email: &str,
    role: MapRole,
) -> Result<()> {
    ensure(map, actor_id, Permission::Manage)?;

    if role == MapRole::Owner {
        return Err(MapiesError::validation(
            "ownership can only be granted by transferring the map",
        ));
    }
    if user_id == map.owner_id {
        return Err(MapiesError::validation("the owner is already on this map"));
    }
    // admin 只能授予或調整 editor 與 viewer
    let actor_role = role_of(map, actor_id).unwrap_or(MapRole::Viewer);
    if actor_role < MapRole::Owner {
        let target_role = role_of(map, user_id);
        if role >= actor_role || target_role.map(|r| r >= actor_role).unwrap_or(false) {
            return Err(MapiesError::permission(
                "admins can only manage editors and viewers",
            ));
        }
    }

    match map.collaborators.iter_mut().find(|c| c.user_id == user_id) {
        Some(existing) => {
            existing.role = role;
            existing.email = email.to_string();
        }
        None => map.collaborators.push(Collaborator {
            user_id: user_id.to_string(),
            email: email.to_string(),
            role,
        }),
    }
    Ok(())
}

/// 協作者可以自行退出；其他情況需要管理權限
pub fn remove_collaborator(map: &mut MapDoc, actor_id: &str, user_id: &str) -> Result<()> {
    if actor_id != user_id {
        ensure(map, actor_id, Permission::Manage)?;
        let actor_role = role_of(map, actor_id).unwrap_or(MapRole::Viewer);
        if actor_role < MapRole::Owner && role_of(map, user_id) >= Some(actor_role) {
            return Err(MapiesError::permission(
                "admins can only remove editors and viewers",
            ));
        }
    }

    let before = map.collaborators.len();
    map.collaborators.retain(|c| c.user_id != user_id);
    if map.collaborators.len() == before {
        return Err(MapiesError::not_found("collaborator", user_id));
    }
    Ok(())
}

/// 轉移擁有權，原擁有者降為 admin
pub fn transfer_ownership(
    map: &mut MapDoc,
    actor_id: &str,
    new_owner_id: &str,
    previous_owner_email: &str,
) -> Result<()> {
    ensure(map, actor_id, Permission::Own)?;
    if new_owner_id == map.owner_id {
        return Ok(());
    }

    let previous_owner = std::mem::replace(&mut map.owner_id, new_owner_id.to_string());
    map.collaborators.retain(|c| c.user_id != new_owner_id);
    map.collaborators.push(Collaborator {
        user_id: previous_owner,
        email: previous_owner_email.to_string(),
        role: MapRole::Admin,
    });
    Ok(())
}

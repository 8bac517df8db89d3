//! Pure application of queued mutations to an element snapshot.
//!
//! The fold works on a clone of the stored state. Any failing command aborts
//! the whole fold and the caller keeps the untouched original, so a commit
//! either applies every command or none.

use super::Mutation;
use crate::model::{ElementData, Property};
use crate::visibility::{Authorizations, Visibility};
use crate::{Error, Result};

/// Apply `mutations` in order to a copy of `state`.
pub(crate) fn apply(
    state: &ElementData,
    mutations: &[Mutation],
    authorizations: &Authorizations,
) -> Result<ElementData> {
    let mut next = state.clone();
    for mutation in mutations {
        apply_one(&mut next, mutation, authorizations)?;
    }
    Ok(next)
}

fn require_readable(visibility: &Visibility, authorizations: &Authorizations, what: &str) -> Result<()> {
    if visibility.can_read(authorizations) {
        Ok(())
    } else {
        Err(Error::AuthorizationError(format!(
            "{what} visibility '{visibility}' is not satisfied by {authorizations}"
        )))
    }
}

fn property_not_found(key: &str, name: &str) -> Error {
    Error::NotFound(format!("property '{name}' (key '{key}')"))
}

fn apply_one(state: &mut ElementData, mutation: &Mutation, auths: &Authorizations) -> Result<()> {
    match mutation {
        Mutation::SetProperty { key, name, value, visibility, metadata } => {
            if value.is_null() {
                return Err(Error::InvalidArgument(format!("property '{name}' cannot be set to null")));
            }
            require_readable(visibility, auths, "property")?;
            for (entry_name, entry) in metadata.iter() {
                require_readable(&entry.visibility, auths, &format!("metadata '{entry_name}'"))?;
            }

            match state.properties.iter_mut().find(|p| p.matches_triple(key, name, visibility)) {
                Some(existing) => {
                    // entries this writer cannot read survive the replacement and
                    // win over a same-named entry from the writer
                    let mut merged = metadata.clone();
                    for (entry_name, entry) in existing.metadata().iter() {
                        if !entry.visibility.can_read(auths) {
                            merged.insert(entry_name, entry.value.clone(), &entry.visibility);
                        }
                    }
                    existing.set_value(value.clone());
                    *existing.metadata_mut() = merged;
                }
                None => {
                    state.properties.push(
                        Property::new(key.clone(), name.clone(), value.clone(), visibility.clone())
                            .with_metadata(metadata.clone()),
                    );
                }
            }
        }

        Mutation::RemoveProperties { key, name } => {
            state.properties.retain(|p| {
                let targeted = p.name() == name && key.as_deref().is_none_or(|k| p.key() == k);
                !(targeted && p.is_visible(auths))
            });
        }

        Mutation::RemoveProperty { key, name, visibility } => {
            require_readable(visibility, auths, "property")?;
            let index = state
                .properties
                .iter()
                .position(|p| p.matches_triple(key, name, visibility) && !p.is_hidden(auths))
                .ok_or_else(|| property_not_found(key, name))?;
            state.properties.remove(index);
        }

        Mutation::AlterPropertyVisibility { key, name, from, visibility } => {
            require_readable(visibility, auths, "new property")?;
            if let Some(from) = from {
                require_readable(from, auths, "property")?;
            }
            let targets: Vec<usize> = state
                .properties
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    p.matches(key, name)
                        && p.is_visible(auths)
                        && from.as_ref().is_none_or(|f| p.visibility() == f)
                })
                .map(|(i, _)| i)
                .collect();
            let target = match targets.as_slice() {
                [] => return Err(property_not_found(key, name)),
                [one] => *one,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "property '{name}' (key '{key}') has {} readable versions; name the visibility to alter",
                        targets.len()
                    )));
                }
            };
            if state.properties[target].visibility() == visibility {
                return Ok(());
            }
            state.properties[target].set_visibility(visibility.clone());
            // the altered property replaces any version already at that triple
            let mut index = 0;
            state.properties.retain(|p| {
                let keep = index == target || !p.matches_triple(key, name, visibility);
                index += 1;
                keep
            });
        }

        Mutation::SetPropertyMetadata { key, name, metadata_name, value, visibility } => {
            require_readable(visibility, auths, "metadata")?;
            let mut found = false;
            for property in state.properties.iter_mut().filter(|p| p.matches(key, name) && p.is_visible(auths)) {
                found = true;
                let shadowed = property
                    .metadata()
                    .get(metadata_name)
                    .is_some_and(|entry| !entry.visibility.can_read(auths));
                if !shadowed {
                    property.metadata_mut().insert(metadata_name.clone(), value.clone(), visibility);
                }
            }
            if !found {
                return Err(property_not_found(key, name));
            }
        }

        Mutation::AlterElementVisibility { visibility } => {
            require_readable(visibility, auths, "element")?;
            state.visibility = visibility.clone();
        }

        Mutation::MarkPropertyHidden { key, name, visibility, hidden } => {
            require_readable(hidden, auths, "hidden")?;
            require_readable(visibility, auths, "property")?;
            state
                .properties
                .iter_mut()
                .find(|p| p.matches_triple(key, name, visibility))
                .ok_or_else(|| property_not_found(key, name))?
                .add_hidden_visibility(hidden.clone());
        }

        Mutation::MarkPropertyVisible { key, name, visibility, hidden } => {
            require_readable(hidden, auths, "hidden")?;
            require_readable(visibility, auths, "property")?;
            state
                .properties
                .iter_mut()
                .find(|p| p.matches_triple(key, name, visibility))
                .ok_or_else(|| property_not_found(key, name))?
                .remove_hidden_visibility(hidden);
        }
    }
    Ok(())
}

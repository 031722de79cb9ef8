//! The codec registry: cache, synthesis, and cycle-breaking forwarders.
//!
//! `lookup` is double-checked: a read-locked fast path returns any resolved
//! codec; the write-locked slow path re-checks, plants a forwarding
//! reference under the key, and releases the lock before the (potentially
//! recursive) synthesis runs. Recursive lookups for the same or dependent
//! keys observe the forwarding reference and return it immediately, so
//! mutually recursive type graphs terminate without topological ordering.
//! The forwarder is resolved exactly once, then the registry entry is
//! replaced with the resolved codec. A failed synthesis removes the planted
//! entry so later lookups can retry.

use crate::api::Wireform;
use crate::codec::{
    Codec, EnumPlan, FieldPlan, ForwardCell, ListPlan, MapKeyMode, MapPlan, ObjectPlan,
};
use crate::descriptor::{FieldDescriptor, PrimitiveKind, TypeKind};
use crate::error::{Result, WireformError};
use crate::key::TypeKey;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub(crate) struct CodecRegistry {
    codecs: RwLock<HashMap<TypeKey, Arc<Codec>>>,
}

impl CodecRegistry {
    pub(crate) fn new() -> Self {
        Self {
            codecs: RwLock::new(HashMap::new()),
        }
    }

    /// Install a caller-supplied codec under `key`, replacing anything
    /// synthesised there. Codecs already composed against the previous entry
    /// keep their reference; nothing is invalidated.
    pub(crate) fn install(&self, key: TypeKey, codec: Arc<Codec>) -> Result<()> {
        self.write()?.insert(key, codec);
        Ok(())
    }

    /// Resolve the codec for `key`, synthesising it on first use.
    pub(crate) fn lookup(&self, engine: &Wireform, key: &TypeKey) -> Result<Arc<Codec>> {
        // Fast path: resolved codecs only. A forwarding entry means a
        // synthesis is in flight; those are handed out under the lock below.
        if let Some(codec) = self.read()?.get(key)
            && !matches!(**codec, Codec::Forward(_))
        {
            return Ok(codec.clone());
        }

        let cell = {
            let mut codecs = self.write()?;
            if let Some(codec) = codecs.get(key) {
                return Ok(codec.clone());
            }
            let cell = ForwardCell::new();
            codecs.insert(key.clone(), Arc::new(Codec::Forward(cell.clone())));
            cell
        };

        // Synthesis runs outside the lock; recursive lookups see the
        // forwarding entry and return it.
        log::debug!("synthesising codec for {key}");
        match synthesise(engine, key) {
            Ok(codec) => {
                cell.resolve(codec.clone())?;
                self.write()?.insert(key.clone(), codec.clone());
                Ok(codec)
            }
            Err(err) => {
                self.write()?.remove(key);
                Err(err)
            }
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<TypeKey, Arc<Codec>>>> {
        self.codecs
            .read()
            .map_err(|_| WireformError::Internal("codec registry lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TypeKey, Arc<Codec>>>> {
        self.codecs
            .write()
            .map_err(|_| WireformError::Internal("codec registry lock poisoned".to_string()))
    }
}

/// Build the codec for a *slot* of the given declared type: the registry
/// codec wrapped in the null layer and, where a runtime type can differ
/// from the declared one, the dynamic dispatcher. Primitive slots stay
/// bare; they can neither be null nor subtyped.
pub(crate) fn slot_codec(engine: &Wireform, key: &TypeKey) -> Result<Arc<Codec>> {
    // The proxy is applied here so the dispatcher compares runtime types
    // against the proxied static type, not the declared alias.
    let key = &engine.proxied(key)?;
    match key {
        TypeKey::Named(name) if PrimitiveKind::from_name(name).is_some() => {
            engine.lookup_resolved(key)
        }
        TypeKey::Named(name) if name == "string" => {
            Ok(Arc::new(Codec::Nullable(engine.lookup_resolved(key)?)))
        }
        TypeKey::Named(name) => Ok(Arc::new(Codec::Nullable(Arc::new(Codec::Dynamic {
            class: name.clone(),
            inner: engine.lookup_resolved(key)?,
        })))),
        TypeKey::Optional(inner) => Ok(Arc::new(Codec::Nullable(slot_codec(engine, inner)?))),
        TypeKey::Any => Ok(Arc::new(Codec::Nullable(Arc::new(Codec::Abstract {
            class: None,
        })))),
        TypeKey::Array(_) | TypeKey::List(_) | TypeKey::Map(..) => {
            Ok(Arc::new(Codec::Nullable(engine.lookup_resolved(key)?)))
        }
    }
}

fn synthesise(engine: &Wireform, key: &TypeKey) -> Result<Arc<Codec>> {
    match key {
        TypeKey::Named(name) => synthesise_named(engine, name),
        TypeKey::Optional(inner) => {
            Ok(Arc::new(Codec::Nullable(slot_codec(engine, inner)?)))
        }
        TypeKey::Array(elem) | TypeKey::List(elem) => Ok(Arc::new(Codec::List(Arc::new(
            ListPlan {
                elem: slot_codec(engine, elem)?,
                constructor: engine.constructor_for(key),
            },
        )))),
        TypeKey::Map(map_key, map_value) => synthesise_map(engine, key, map_key, map_value),
        TypeKey::Any => Ok(Arc::new(Codec::Abstract { class: None })),
    }
}

fn synthesise_named(engine: &Wireform, name: &str) -> Result<Arc<Codec>> {
    if let Some(kind) = PrimitiveKind::from_name(name) {
        return Ok(Arc::new(Codec::Primitive(kind)));
    }
    if name == "string" {
        return Ok(Arc::new(Codec::Str));
    }
    let descriptor = engine.descriptor(name).ok_or_else(|| {
        WireformError::UnknownType(format!("no descriptor registered for '{name}'"))
    })?;
    match &descriptor.kind {
        TypeKind::Primitive(kind) => Ok(Arc::new(Codec::Primitive(*kind))),
        TypeKind::Enum(constants) => Ok(Arc::new(Codec::Enum(Arc::new(EnumPlan {
            class: name.to_string(),
            constants: constants.clone(),
        })))),
        TypeKind::Abstract => Ok(Arc::new(Codec::Abstract {
            class: Some(name.to_string()),
        })),
        TypeKind::Object(fields) => synthesise_object(engine, name, fields),
    }
}

fn synthesise_object(
    engine: &Wireform,
    class: &str,
    fields: &[FieldDescriptor],
) -> Result<Arc<Codec>> {
    let mut wire_names: Vec<String> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut plans = Vec::with_capacity(fields.len());

    for field in fields {
        let occurrence = {
            let count = seen.entry(field.name.clone()).or_insert(0);
            let occurrence = *count;
            *count += 1;
            occurrence
        };
        // The later duplicate gains the star; the prefix is part of the
        // wire name and round-trips.
        let mut wire = field.name.clone();
        while wire_names.contains(&wire) {
            wire.insert(0, '*');
        }
        wire_names.push(wire.clone());
        plans.push(FieldPlan {
            name: field.name.clone(),
            wire,
            occurrence,
            codec: slot_codec(engine, &field.ty)?,
        });
    }

    let constructor = engine
        .constructor_for(&TypeKey::named(class))
        .unwrap_or_else(|| {
            let class = class.to_string();
            let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
            Arc::new(move || Value::Object {
                class: class.clone(),
                fields: names.iter().map(|n| (n.clone(), Value::Null)).collect(),
            })
        });

    Ok(Arc::new(Codec::Object(Arc::new(ObjectPlan {
        class: class.to_string(),
        fields: plans,
        constructor,
    }))))
}

fn synthesise_map(
    engine: &Wireform,
    key: &TypeKey,
    map_key: &TypeKey,
    map_value: &TypeKey,
) -> Result<Arc<Codec>> {
    let mode = if *map_key == TypeKey::string() {
        MapKeyMode::StringKeys
    } else {
        match &*engine.lookup(map_key)? {
            Codec::StringProxy(proxy) => MapKeyMode::Proxied(proxy.clone()),
            _ => MapKeyMode::Entries,
        }
    };
    Ok(Arc::new(Codec::Map(Arc::new(MapPlan {
        key: slot_codec(engine, map_key)?,
        value: slot_codec(engine, map_value)?,
        mode,
        constructor: engine.constructor_for(key),
    }))))
}

use pest::iterators::Pair;

use super::{pos, Ident, Position, Rule, Str, TransformError, TransformResult};

/// `capability Name { resource "<glob>"; allow <operation>; }`.
///
/// The declaration names the capability type, the resource glob patterns
/// it covers, and the operations it allows. The generator turns it into
/// token-factory and context-entry scaffolding.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDecl {
    pub name: Ident,
    pub resources: Vec<Str>,
    pub operations: Vec<Ident>,
    pub position: Position,
}

impl CapabilityDecl {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<CapabilityDecl> {
        let position = pos(&pair, file);

        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return Err(TransformError::new("capability without name", position));
        };
        let name = Ident::from_pair(name, file)?;

        let mut resources = vec![];
        let mut operations = vec![];

        for item in inner {
            let item_pos = pos(&item, file);
            match item.as_rule() {
                Rule::resource_item => {
                    let Some(glob) = item.into_inner().next() else {
                        return Err(TransformError::new("resource without pattern", item_pos));
                    };
                    resources.push(Str::from_pair(glob, file)?);
                }
                Rule::allow_item => {
                    let Some(operation) = item.into_inner().next() else {
                        return Err(TransformError::new("allow without operation", item_pos));
                    };
                    operations.push(Ident::from_pair(operation, file)?);
                }
                other => {
                    return Err(TransformError::new(
                        format!("unexpected capability item '{other:?}'"),
                        item_pos,
                    ))
                }
            }
        }

        Ok(CapabilityDecl {
            name,
            resources,
            operations,
            position,
        })
    }
}

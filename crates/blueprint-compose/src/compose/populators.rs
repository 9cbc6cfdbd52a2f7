//! Populators: nested create-one actions repeated a fixed number of times.

use blueprint_ast::spec::{
    ModelActionSpec, PopulateSpec, PopulatorSpec, RefIdent, TargetSpec,
};
use blueprint_ast::{ContextKind, Ref, Type};

use super::ComposeSession;
use super::select::id_select;
use crate::definition::{ModelActionDef, PopulateDef, PopulatorDef, RepeaterDef};
use crate::error::ComposeResult;

impl ComposeSession<'_> {
    pub(super) fn populator(&self, populator: &PopulatorSpec) -> ComposeResult<PopulatorDef> {
        Ok(PopulatorDef {
            name: populator.name.clone(),
            populates: self.populates(&populator.populates, None, &[])?,
        })
    }

    fn populates(
        &self,
        populates: &[PopulateSpec],
        parent: Option<&TargetSpec>,
        name_path: &[String],
    ) -> ComposeResult<Vec<PopulateDef>> {
        populates
            .iter()
            .map(|populate| self.populate(populate, parent, name_path))
            .collect()
    }

    fn populate(
        &self,
        populate: &PopulateSpec,
        parent: Option<&TargetSpec>,
        name_path: &[String],
    ) -> ComposeResult<PopulateDef> {
        let mut name_path = name_path.to_vec();
        name_path.push(populate.target.name.clone());
        let target = self.target_def(&populate.target, name_path.clone())?;

        let member = RefIdent {
            text: populate.target.name.clone(),
            ref_: populate.target.ref_.clone(),
            ty: Type::model(&populate.target.model),
        };
        // Nested populates create through the parent's relation, which links
        // each row to the parent row created in the same step.
        let target_path = match parent {
            Some(parent) => vec![
                RefIdent {
                    text: parent.alias.clone(),
                    ref_: Ref::context(ContextKind::Action),
                    ty: Type::model(&parent.model),
                },
                member,
            ],
            None => vec![member],
        };
        let spec = ModelActionSpec {
            alias: populate.target.alias.clone(),
            target_path,
            model: populate.target.model.clone(),
            is_primary: true,
            atoms: populate.atoms.clone(),
        };

        let action = ModelActionDef {
            alias: spec.alias.clone(),
            is_primary: true,
            target_path: spec.target_path.iter().map(|s| s.text.clone()).collect(),
            model_ref_key: spec.model.clone(),
            changeset: self.changeset(&spec, true, &[], None)?,
            select: id_select(&spec.model),
        };

        Ok(PopulateDef {
            target,
            repeater: RepeaterDef {
                alias: populate.repeater.alias.clone(),
                start: populate.repeater.start,
                end: populate.repeater.end,
            },
            action,
            populates: self.populates(&populate.populates, Some(&populate.target), &name_path)?,
        })
    }
}

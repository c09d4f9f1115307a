//! PLACE and BUILD.
//!
//! PLACE tries the six faces around the agent for something to place
//! against. BUILD lays a hollow cube shell anchored at the agent's block,
//! bottom layer first, so every cell has a placed or natural neighbour to
//! attach to by the time it is reached.

use async_trait::async_trait;
use minebrain_core::{
    ActionContext, ActionError, ActionHandler, ActionOutcome, BlockPos, Command, ExecutionMode, Face, Verb,
};
use tracing::{debug, warn};

pub struct PlaceHandler;

#[async_trait]
impl ActionHandler for PlaceHandler {
    fn verb(&self) -> Verb {
        Verb::Place
    }

    fn usage(&self) -> &str {
        "PLACE <slotId>"
    }

    fn description(&self) -> &str {
        "Places a block from the specified inventory slot in the current direction."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Place { slot } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let item = crate::occupied_slot(ctx, slot).await?;
        ctx.game.equip(slot).await?;

        let origin = ctx.game.status().await?.position.floored();
        let distance = ctx.limits.place_reach;

        for face in Face::SURFACE_ORDER {
            let surface = origin.step(face, distance - 1);
            let solid = match ctx.game.block_at(surface).await {
                Ok(block) => block.is_some_and(|block| !block.is_air()),
                Err(e) => {
                    warn!(%surface, ?face, error = %e, "PLACE could not read the surface");
                    continue;
                }
            };
            if !solid {
                continue;
            }

            match ctx.game.place_block(surface, face).await {
                Ok(()) => {
                    let target = surface.step(face, 1);
                    return Ok(ActionOutcome::quiet(format!("placed {} at {target}", item.name)));
                }
                Err(e) => debug!(%surface, ?face, error = %e, "PLACE surface rejected the block"),
            }
        }

        Err(ActionError::failed(self.verb().as_str(), "no suitable surface"))
    }
}

pub struct BuildHandler;

/// Cells on the outer shell of a cube with edge `size`, as offsets from the
/// anchor corner. Ordered by layer (y), then x, then z.
pub fn shell_cells(size: u32) -> Vec<(i32, i32, i32)> {
    let edge = size as i32;
    let on_edge = |v: i32| v == 0 || v == edge - 1;
    let mut cells = Vec::new();
    for y in 0..edge {
        for x in 0..edge {
            for z in 0..edge {
                if on_edge(x) || on_edge(y) || on_edge(z) {
                    cells.push((x, y, z));
                }
            }
        }
    }
    cells
}

/// Faces to attach a new block through, block-below first.
const ATTACH_ORDER: [Face; 6] = [Face::Up, Face::East, Face::West, Face::South, Face::North, Face::Down];

#[async_trait]
impl ActionHandler for BuildHandler {
    fn verb(&self) -> Verb {
        Verb::Build
    }

    fn usage(&self) -> &str {
        "BUILD <size> <slotId>"
    }

    fn description(&self) -> &str {
        "Builds a cube of the specified size with the block in the specified inventory slot."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::LongRunning
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Build { size, slot } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        if size > ctx.limits.build_max_size {
            return Err(ActionError::failed(
                self.verb().as_str(),
                format!("size {size} is over the limit of {}", ctx.limits.build_max_size),
            ));
        }

        let item = crate::occupied_slot(ctx, slot).await?;
        ctx.game.equip(slot).await?;
        let anchor = ctx.game.status().await?.position.floored();

        let (mut placed, mut failed) = (0usize, 0usize);
        let mut first_error = None;
        for (x, y, z) in shell_cells(size) {
            let cell = anchor.offset(x, y, z);
            match place_cell(ctx, cell).await {
                Ok(()) => placed += 1,
                Err(e) => {
                    warn!(%cell, error = %e, "BUILD placement failed");
                    failed += 1;
                    first_error.get_or_insert(e);
                    match ctx.game.slot(slot).await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            warn!(slot, "BUILD ran out of blocks");
                            break;
                        }
                        Err(e) => warn!(slot, error = %e, "BUILD could not re-read the slot"),
                    }
                }
            }
        }

        let summary = format!("built {size}x{size}x{size} {} shell: {placed} placed, {failed} failed", item.name);
        if placed == 0 && failed > 0 {
            let cause = first_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(ActionError::failed(
                self.verb().as_str(),
                format!("no blocks placed ({cause})"),
            ));
        }
        Ok(ActionOutcome::announced(summary.clone(), summary))
    }
}

/// Place one block at `cell` against the first solid neighbour.
async fn place_cell(ctx: &ActionContext, cell: BlockPos) -> Result<(), ActionError> {
    for face in ATTACH_ORDER {
        let reference = cell.step(face, -1);
        let solid = ctx
            .game
            .block_at(reference)
            .await?
            .is_some_and(|block| !block.is_air());
        if solid {
            ctx.game.place_block(reference, face).await?;
            return Ok(());
        }
    }
    Err(ActionError::failed("BUILD", format!("nothing to attach to at {cell}")))
}

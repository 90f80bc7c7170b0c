// crates/clock-gate-core/src/runtime/consumer.rs
// ============================================================================
// Module: Clock Gate Consumer Initialization
// Description: Open a channel and position it per its offset policy.
// Purpose: Skip stale backlog by default while allowing replay per channel.
// Dependencies: tracing, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! `Latest` positions the consumer at the topic's high watermark so the first
//! delivered record is the next one produced after open. When the watermark
//! query fails the channel keeps whatever default position the bus gave it.
//! `Earliest` rewinds to the first retained record and `StoredOrDefault`
//! leaves the bus-assigned position alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;

use crate::core::ChannelSpec;
use crate::core::OffsetPolicy;
use crate::interfaces::ChannelInitError;
use crate::interfaces::MessageBus;
use crate::interfaces::MessageChannel;
use crate::interfaces::StartPosition;

// ============================================================================
// SECTION: Consumer Initialization
// ============================================================================

/// Opens a channel for `spec` and applies its offset policy.
///
/// # Errors
///
/// Returns [`ChannelInitError`] when the bus cannot open the channel or the
/// channel rejects its start position.
pub fn open_consumer(
    bus: &dyn MessageBus,
    spec: &ChannelSpec,
) -> Result<Box<dyn MessageChannel>, ChannelInitError> {
    let mut channel = bus.connect(spec)?;
    let position = match spec.offset_policy {
        OffsetPolicy::Latest => match channel.high_watermark() {
            Ok(offset) if offset >= 0 => Some(StartPosition::Offset(offset)),
            Ok(offset) => {
                warn!(topic = spec.topic.as_str(), offset, "ignoring negative high watermark");
                None
            }
            Err(err) => {
                warn!(
                    topic = spec.topic.as_str(),
                    error = %err,
                    "high watermark query failed; using default offset"
                );
                None
            }
        },
        OffsetPolicy::Earliest => Some(StartPosition::Beginning),
        OffsetPolicy::StoredOrDefault => None,
    };
    if let Some(position) = position
        && let Err(err) = channel.seek(position)
    {
        channel.close();
        return Err(ChannelInitError::Assignment {
            topic: spec.topic.clone(),
            reason: err.to_string(),
        });
    }
    match position {
        Some(StartPosition::Offset(offset)) => {
            info!(
                topic = spec.topic.as_str(),
                group = spec.group.as_str(),
                offset,
                "consumer initial offset"
            );
        }
        Some(StartPosition::Beginning) => {
            info!(
                topic = spec.topic.as_str(),
                group = spec.group.as_str(),
                "consumer starting at beginning"
            );
        }
        None => {
            info!(
                topic = spec.topic.as_str(),
                group = spec.group.as_str(),
                "consumer starting at default offset"
            );
        }
    }
    Ok(channel)
}

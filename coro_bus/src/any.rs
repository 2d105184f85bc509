/*
 *   Copyright (c) 2022 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! Type-erased value and error payloads that cross subsystem/coroutine boundaries.
//!
//! The bus and scheduler are generic over *many* concrete submission/completion
//! payload types but must still store them in uniform, `'static` collections
//! (queues, maps). Rather than growing the core generic over every payload type a
//! coroutine might ever produce, values that leave their originating type are
//! boxed behind [`AnyValue`]/[`AnyError`] and downcast back at the one call site
//! that knows the concrete type.

use std::{any::Any, sync::Arc};

/// A cloneable, type-erased success value.
///
/// `Arc` (not `Box`) because a final value may need to be read more than once:
/// once to resolve an external future, and again for every pending promise
/// drained after the owning computation has already returned (see the
/// post-final drain behavior in the scheduler).
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// A cloneable, type-erased failure value.
pub type AnyError = Arc<dyn std::error::Error + Send + Sync>;

/// Boxes `v` as an [`AnyValue`].
pub fn value<T: Send + Sync + 'static>(v: T) -> AnyValue {
    Arc::new(v)
}

/// Boxes `e` as an [`AnyError`].
pub fn error<E: std::error::Error + Send + Sync + 'static>(e: E) -> AnyError {
    Arc::new(e)
}

/// Downcasts an [`AnyValue`] to a concrete `T`, returning `None` on mismatch.
pub fn downcast<T: 'static>(v: &AnyValue) -> Option<&T> {
    v.downcast_ref::<T>()
}

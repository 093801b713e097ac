// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use strum::IntoEnumIterator;

/// Dense array keyed by a `#[repr(u8)]` enum. `N` must equal the variant count.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EnumArray<K, V, const N: usize> {
    values: [V; N],
    spooky: PhantomData<K>,
}

impl<K, V: Default, const N: usize> Default for EnumArray<K, V, N> {
    fn default() -> Self {
        Self {
            values: [(); N].map(|_| V::default()),
            spooky: PhantomData,
        }
    }
}

impl<K, V: Default, const N: usize> EnumArray<K, V, N> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, const N: usize> EnumArray<K, V, N>
where
    u8: From<K>,
{
    fn to_idx(k: K) -> usize {
        let i: u8 = k.into();
        i as usize
    }
}

impl<K: IntoEnumIterator, V: Default, const N: usize> EnumArray<K, V, N>
where
    u8: From<K>,
{
    /// Builds an array by evaluating `f` once per key, in key order.
    pub fn from_fn(mut f: impl FnMut(K) -> V) -> Self {
        let mut out = Self::default();
        for (k, v) in out.iter_mut() {
            *v = f(k);
        }
        out
    }
}

impl<K: IntoEnumIterator, V, const N: usize> EnumArray<K, V, N>
where
    u8: From<K>,
{
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        K::iter().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> + '_ {
        K::iter().zip(self.values.iter_mut())
    }
}

impl<K: IntoEnumIterator + Copy, V, const N: usize> Index<K> for EnumArray<K, V, N>
where
    u8: From<K>,
{
    type Output = V;
    fn index(&self, index: K) -> &Self::Output {
        &self.values[Self::to_idx(index)]
    }
}

impl<K: IntoEnumIterator + Copy, V, const N: usize> IndexMut<K> for EnumArray<K, V, N>
where
    u8: From<K>,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.values[Self::to_idx(index)]
    }
}

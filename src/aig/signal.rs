use std::fmt;
use std::ops::{BitXor, BitXorAssign, Not};

/// Representation of an edge of the graph: a node with an optional complement
///
/// The constant-one node lives at index 0, so that `Signal::one()` is node 0
/// uncomplemented and `Signal::zero()` its complement.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Signal {
    a: u32,
}

impl Signal {
    /// Constant zero signal
    pub fn zero() -> Signal {
        Signal { a: 1 }
    }

    /// Constant one signal
    pub fn one() -> Signal {
        Signal { a: 0 }
    }

    /// Create an uncomplemented signal from a node index
    pub fn from_node(n: u32) -> Signal {
        Signal::new(n, false)
    }

    /// Create a signal from a node index and a complement flag
    pub fn new(n: u32, inverted: bool) -> Signal {
        debug_assert!(n <= u32::MAX >> 1);
        Signal {
            a: n << 1 | inverted as u32,
        }
    }

    /// Obtain the node index associated with the signal
    pub fn node(&self) -> u32 {
        self.a >> 1
    }

    /// Returns true if the signal points at the constant node
    pub fn is_constant(&self) -> bool {
        self.node() == 0
    }

    /// Returns true if the signal is complemented
    pub fn is_inverted(&self) -> bool {
        self.a & 1 != 0
    }

    /// Clear the complement, if set
    pub fn without_inversion(&self) -> Signal {
        Signal { a: self.a & !1u32 }
    }

    /// Return the internal representation of the signal
    pub fn raw(&self) -> u32 {
        self.a
    }
}

impl Default for Signal {
    fn default() -> Signal {
        Signal::zero()
    }
}

impl From<bool> for Signal {
    fn from(b: bool) -> Signal {
        if b {
            Signal::one()
        } else {
            Signal::zero()
        }
    }
}

impl Not for Signal {
    type Output = Signal;
    fn not(self) -> Signal {
        Signal { a: self.a ^ 1u32 }
    }
}

impl Not for &'_ Signal {
    type Output = Signal;
    fn not(self) -> Signal {
        Signal { a: self.a ^ 1u32 }
    }
}

impl BitXorAssign<bool> for Signal {
    fn bitxor_assign(&mut self, rhs: bool) {
        self.a ^= rhs as u32;
    }
}

impl BitXor<bool> for Signal {
    type Output = Signal;
    fn bitxor(self, rhs: bool) -> Self::Output {
        let mut l = self;
        l ^= rhs;
        l
    }
}

impl BitXor<bool> for &'_ Signal {
    type Output = Signal;
    fn bitxor(self, rhs: bool) -> Self::Output {
        let mut l = *self;
        l ^= rhs;
        l
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            let a = 1 - (self.a & 1);
            write!(f, "{a}")
        } else {
            if self.is_inverted() {
                write!(f, "!")?;
            }
            let n = self.node();
            write!(f, "n{n}")
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let l0 = Signal::zero();
        let l1 = Signal::one();
        assert_eq!(l0, !l1);
        assert_eq!(l1, !l0);
        assert!(l0.is_inverted());
        assert!(!l1.is_inverted());
        assert!(l0.is_constant() && l1.is_constant());
        assert_eq!(format!("{l0}"), "0");
        assert_eq!(format!("{l1}"), "1");
    }

    #[test]
    fn test_node() {
        for n in 1u32..10u32 {
            let l = Signal::from_node(n);
            assert!(!l.is_constant());
            assert_eq!(l.node(), n);
            assert_eq!((!l).node(), n);
            assert!(!l.is_inverted());
            assert!((!l).is_inverted());
            assert_eq!(l ^ false, l);
            assert_eq!(l ^ true, !l);
            assert_eq!((!l).without_inversion(), l);
            assert_eq!(format!("{l}"), format!("n{n}"));
            assert_eq!(format!("{}", !l), format!("!n{n}"));
        }
    }

    #[test]
    fn test_comparison() {
        assert_eq!(Signal::from(false), Signal::zero());
        assert_eq!(Signal::from(true), Signal::one());
        assert_ne!(Signal::from_node(1), Signal::from_node(2));
        assert_ne!(Signal::from_node(1), !Signal::from_node(1));
        assert_eq!(Signal::new(3, true), !Signal::from_node(3));
    }
}

//! Stock inline operators, written in the source language itself.
//!
//! Every compilation starts from these definitions; user programs may add
//! further operators (including further overloads of the same symbols) on
//! top. Comparison results are `bool`, arithmetic stays `int`, and everything
//! bottoms out in the `__OP__` machine intrinsics. Division and modulo have
//! no stock definition; programs that need them declare their own.

/// The stock operator definitions, parsed ahead of every user program
pub const STANDARD_OPERATORS: &str = "\
operator + (int a, int b) -> int { return __ADD__(a, b); }
operator - (int a, int b) -> int { return __SUB__(a, b); }
operator & (int a, int b) -> int { return __AND__(a, b); }
operator | (int a, int b) -> int { return __OR__(a, b); }
operator ^ (int a, int b) -> int { return __XOR__(a, b); }
operator << (int a, int b) -> int { return __SL__(a, b); }
operator >> (int a, int b) -> int { return __SRL__(a, b); }
operator ~ (int a) -> int { return __ANT__(-1, a); }
operator ! (int a) -> bool { bool r = 1; r = __MNZ__(a, 0); return r; }
operator ! (bool a) -> bool { bool r = 1; r = __MNZ__(a, 0); return r; }
operator < (int a, int b) -> bool { bool r = 0; int d = __SUB__(a, b); r = __MLZ__(d, 1); return r; }
operator > (int a, int b) -> bool { bool r = 0; int d = __SUB__(b, a); r = __MLZ__(d, 1); return r; }
operator <= (int a, int b) -> bool { bool r = 0; int d = __SUB__(b, a); r = __MLZ__(d, 1); r = __XOR__(r, 1); return r; }
operator >= (int a, int b) -> bool { bool r = 0; int d = __SUB__(a, b); r = __MLZ__(d, 1); r = __XOR__(r, 1); return r; }
operator == (int a, int b) -> bool { bool r = 1; int d = __XOR__(a, b); r = __MNZ__(d, 0); return r; }
operator != (int a, int b) -> bool { bool r = 0; int d = __XOR__(a, b); r = __MNZ__(d, 1); return r; }
operator * (int a, int b) -> int { int r = 0; int x = a; int n = b; while (n) { int low = __AND__(n, 1); if (low) { r += x; } x = __SL__(x, 1); n = __SRL__(n, 1); } return r; }
";

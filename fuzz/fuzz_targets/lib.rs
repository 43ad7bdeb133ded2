#[derive(Debug)]
pub enum CacheOperation {
    Put(u8, u8),
    Get(u8),
    Peek(u8),
    Contains(u8),
    Remove(u8),
    PopLru,
    Clear,
    Iter,
}

impl<'a> arbitrary::Arbitrary<'a> for CacheOperation {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=7)? {
            0 => Ok(CacheOperation::Put(u.arbitrary()?, u.arbitrary()?)),
            1 => Ok(CacheOperation::Get(u.arbitrary()?)),
            2 => Ok(CacheOperation::Peek(u.arbitrary()?)),
            3 => Ok(CacheOperation::Contains(u.arbitrary()?)),
            4 => Ok(CacheOperation::Remove(u.arbitrary()?)),
            5 => Ok(CacheOperation::PopLru),
            6 => Ok(CacheOperation::Clear),
            7 => Ok(CacheOperation::Iter),
            _ => unreachable!(),
        }
    }
}

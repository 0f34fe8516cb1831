/// Index of a block inside a [`BlockTree`]
pub type BlockId = usize;

/// Range of instructions `from..=to`, nested inside a parent block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub from: usize,
    pub to: usize,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    depth: usize,
}

impl Block {
    pub fn contains(&self, index: usize) -> bool {
        self.from <= index && index <= self.to
    }

    fn contains_range(&self, from: usize, to: usize) -> bool {
        self.from <= from && to <= self.to
    }

    fn overlaps(&self, from: usize, to: usize) -> bool {
        self.from <= to && from <= self.to
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Number of blocks enclosing this one (`0` for the root)
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Nested decomposition of the instructions of a method into blocks
///
/// The tree starts out as one root block spanning the whole method. Every control flow edge
/// discovered during the analysis can add a block spanning its source and destination. Sibling
/// blocks never overlap: a new block partially overlapping a sibling grows to cover it.
#[derive(Clone, Debug)]
pub struct BlockTree {
    blocks: Vec<Block>,
}

impl BlockTree {
    const ROOT: BlockId = 0;

    /// Tree with only the root block, for a method with `len` instructions
    pub fn new(len: usize) -> BlockTree {
        let root = Block {
            from: 0,
            to: len.saturating_sub(1),
            parent: None,
            children: vec![],
            depth: 0,
        };
        BlockTree { blocks: vec![root] }
    }

    pub fn root(&self) -> BlockId {
        Self::ROOT
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add a block spanning two instructions (in any order)
    pub fn add_block(&mut self, start: usize, end: usize) {
        let (from, to) = if start <= end {
            (start, end)
        } else {
            (end, start)
        };
        let root = &self.blocks[Self::ROOT];
        let (from, to) = (from.max(root.from), to.min(root.to));
        self.insert(Self::ROOT, from, to);
    }

    fn insert(&mut self, parent: BlockId, mut from: usize, mut to: usize) {
        // Fits inside a child: that child is where the block goes
        let mut enclosing = None;
        for &child in &self.blocks[parent].children {
            let block = &self.blocks[child];
            if block.from == from && block.to == to {
                return;
            }
            if block.contains_range(from, to) {
                enclosing = Some(child);
                break;
            }
        }
        if let Some(child) = enclosing {
            return self.insert(child, from, to);
        }

        // Grow over partially overlapping siblings until the edges are stable
        loop {
            let mut grown = false;
            for &child in &self.blocks[parent].children {
                let block = &self.blocks[child];
                if block.overlaps(from, to) && !(from <= block.from && block.to <= to) {
                    from = from.min(block.from);
                    to = to.max(block.to);
                    grown = true;
                }
            }
            if !grown {
                break;
            }
        }
        let parent_block = &self.blocks[parent];
        if parent_block.from == from && parent_block.to == to {
            return;
        }

        let id = self.blocks.len();
        let depth = parent_block.depth + 1;
        let (absorbed, kept): (Vec<BlockId>, Vec<BlockId>) = parent_block
            .children
            .iter()
            .copied()
            .partition(|child| self.blocks[*child].overlaps(from, to));

        self.blocks.push(Block {
            from,
            to,
            parent: Some(parent),
            children: absorbed.clone(),
            depth,
        });
        for child in absorbed {
            self.blocks[child].parent = Some(id);
            self.deepen(child);
        }

        let mut children = kept;
        children.push(id);
        children.sort_by_key(|child| self.blocks[*child].to);
        self.blocks[parent].children = children;
    }

    /// Recompute the depths of a re-parented block and its descendants
    fn deepen(&mut self, id: BlockId) {
        let depth = match self.blocks[id].parent {
            Some(parent) => self.blocks[parent].depth + 1,
            None => 0,
        };
        self.blocks[id].depth = depth;
        for child in self.blocks[id].children.clone() {
            self.deepen(child);
        }
    }

    /// Deepest block containing the instruction
    pub fn block_at(&self, index: usize) -> BlockId {
        let mut current = Self::ROOT;
        'descend: loop {
            for &child in &self.blocks[current].children {
                if self.blocks[child].contains(index) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Innermost block enclosing both instructions, unless that is the root
    pub fn common_block(&self, first: usize, second: usize) -> Option<BlockId> {
        let mut current = Some(self.block_at(first));
        while let Some(id) = current {
            if id == Self::ROOT {
                return None;
            }
            let block = &self.blocks[id];
            if block.contains(second) {
                return Some(id);
            }
            current = block.parent;
        }
        None
    }
}
